//! Text and date clean-up applied to every decoded feed before it is stored.
//!
//! Producers routinely double-encode entities (`&amp;amp;`), so after the XML
//! layer has decoded once we decode HTML entities a second time here.

use chrono::{DateTime, Utc};

use super::types::{NormalizedFeed, NormalizedItem, RawFeed, RawItem};

// Longest entity body we look at, e.g. "#x1F600" or "hellip".
const MAX_ENTITY_LEN: usize = 10;

pub fn normalize(raw: RawFeed, now: DateTime<Utc>) -> NormalizedFeed {
    NormalizedFeed {
        title: raw.title.as_deref().map(clean_text).unwrap_or_default(),
        link: raw.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
        description: clean_opt(raw.description.as_deref()),
        items: raw.items.into_iter().map(|item| normalize_item(item, now)).collect(),
    }
}

fn normalize_item(item: RawItem, now: DateTime<Utc>) -> NormalizedItem {
    let parsed = item.pub_date.as_deref().and_then(parse_published);
    NormalizedItem {
        title: item.title.as_deref().map(clean_text).unwrap_or_default(),
        link: item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
        description: clean_opt(item.description.as_deref()),
        published_at: parsed.unwrap_or(now),
        published_at_fallback: parsed.is_none(),
    }
}

fn clean_opt(s: Option<&str>) -> Option<String> {
    s.map(clean_text).filter(|s| !s.is_empty())
}

pub fn clean_text(s: &str) -> String {
    collapse_whitespace(&decode_entities(s))
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// RSS dates are RFC 1123 with a numeric zone (RFC 2822); RFC 3339 shows up
/// in feeds that borrow Atom/Dublin Core conventions.
pub fn parse_published(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) { return Some(dt.with_timezone(&Utc)); }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) { return Some(dt.with_timezone(&Utc)); }
    None
}

/// Decode named and numeric character references. Unknown or malformed
/// references are left as they are.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_entity(&tail[1..=end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 2..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "hellip" => '\u{2026}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&lt;b&gt; &quot;hi&quot; &#39;x&#39; &#x41;"), "<b> \"hi\" 'x' A");
        assert_eq!(decode_entities("it&rsquo;s&hellip;"), "it\u{2019}s\u{2026}");
    }

    #[test]
    fn double_encoded_amp_decodes_one_level() {
        assert_eq!(decode_entities("R&amp;amp;D"), "R&amp;D");
    }

    #[test]
    fn unknown_or_broken_entities_are_kept() {
        assert_eq!(decode_entities("AT&T and &bogus; and &;"), "AT&T and &bogus; and &;");
        assert_eq!(decode_entities("trailing &amp"), "trailing &amp");
        assert_eq!(decode_entities("&#xZZ; &#99999999;"), "&#xZZ; &#99999999;");
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Hello\n\t  world&nbsp;&nbsp;again  "), "Hello world again");
    }

    #[test]
    fn parses_rss_and_rfc3339_dates() {
        let want = Utc.with_ymd_and_hms(2024, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parse_published("Mon, 21 Oct 2024 07:28:00 +0000"), Some(want));
        assert_eq!(parse_published("Mon, 21 Oct 2024 09:28:00 +0200"), Some(want));
        assert_eq!(parse_published("Mon, 21 Oct 2024 07:28:00 GMT"), Some(want));
        assert_eq!(parse_published("2024-10-21T07:28:00Z"), Some(want));
        assert_eq!(parse_published("last tuesday"), None);
    }

    #[test]
    fn malformed_date_falls_back_to_now() {
        let raw = RawFeed {
            title: Some("Feed".into()),
            items: vec![
                RawItem { link: Some("https://e.com/1".into()), pub_date: Some("not a date".into()), ..Default::default() },
                RawItem { link: Some("https://e.com/2".into()), pub_date: None, ..Default::default() },
                RawItem { link: Some("https://e.com/3".into()), pub_date: Some("Mon, 21 Oct 2024 07:28:00 +0000".into()), ..Default::default() },
            ],
            ..Default::default()
        };
        let doc = normalize(raw, now());
        assert_eq!(doc.items.len(), 3);
        assert_eq!(doc.items[0].published_at, now());
        assert!(doc.items[0].published_at_fallback);
        assert_eq!(doc.items[1].published_at, now());
        assert!(!doc.items[2].published_at_fallback);
    }

    #[test]
    fn normalize_is_deterministic() {
        let raw = RawFeed {
            title: Some(" A &amp; B ".into()),
            link: Some(" https://e.com ".into()),
            description: Some("   ".into()),
            items: vec![RawItem {
                title: Some("Q&amp;amp;A".into()),
                link: Some("https://e.com/qa".into()),
                description: Some("<p>x</p>".into()),
                pub_date: None,
            }],
        };
        let a = normalize(raw.clone(), now());
        let b = normalize(raw, now());
        assert_eq!(a, b);
        assert_eq!(a.title, "A & B");
        assert_eq!(a.link.as_deref(), Some("https://e.com"));
        assert_eq!(a.description, None);
        assert_eq!(a.items[0].title, "Q&amp;A");
        assert_eq!(a.items[0].description.as_deref(), Some("<p>x</p>"));
    }
}
