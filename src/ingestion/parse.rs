use rss::{Channel, Item};
use bytes::Bytes;

use super::types::{RawFeed, RawItem};

pub fn parse_channel(xml: &Bytes) -> Result<Channel, rss::Error> {
    Channel::read_from(&xml[..])
}

pub fn raw_feed(channel: &Channel) -> RawFeed {
    RawFeed {
        title: non_empty(channel.title()),
        link: non_empty(channel.link()),
        description: non_empty(channel.description()),
        items: channel.items().iter().map(raw_item).collect(),
    }
}

fn raw_item(item: &Item) -> RawItem {
    RawItem {
        title: item.title().and_then(non_empty),
        link: item.link().and_then(non_empty),
        description: item.description().and_then(non_empty),
        pub_date: item.pub_date().and_then(non_empty).or_else(|| dublin_core_date(item)),
    }
}

// Fall back to <dc:date> when the item has no pubDate
fn dublin_core_date(item: &Item) -> Option<String> {
    item.dublin_core_ext()
        .and_then(|dc| dc.dates().first())
        .and_then(|d| non_empty(d))
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}
