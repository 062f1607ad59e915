use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const MAX_INTERVAL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

// Parse an interval string like "30s", "1m", "1h30m" or "500ms".
// Zero is rejected: a zero-period ticker would spin.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let d = humantime::parse_duration(s.trim())
        .with_context(|| format!("invalid duration {s:?} (expected e.g. 30s, 1m, 1h30m)"))?;
    if d.is_zero() { bail!("duration must be greater than zero: {s:?}"); }
    if d > MAX_INTERVAL {
        bail!("duration {s:?} is too long (at most {})", humantime::format_duration(MAX_INTERVAL));
    }
    Ok(d)
}

// Convert for chrono arithmetic against stored timestamps.
pub fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

// Compact "how long ago" for listings, e.g. "5m ago"; "never" for None.
pub fn ago(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else { return "never".to_string() };
    let secs = (now - at).num_seconds().max(0) as u64;
    format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
}
