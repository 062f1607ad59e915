use crate::store::{Feed, NewPost, Store, StoreError};
use crate::telemetry::{self};

use super::types::{IngestReport, NormalizedFeed};

/// Turn every item of `doc` into a post of `feed`.
///
/// The post url is the only dedup key: an item whose link is already stored
/// is counted as skipped, never rewritten. Items without a link cannot be
/// keyed and are dropped. Any other store failure aborts the feed.
pub async fn ingest<S: Store>(store: &S, feed: &Feed, doc: &NormalizedFeed) -> Result<IngestReport, StoreError> {
    let log = telemetry::agg();
    let mut report = IngestReport::default();
    log.debug_kv("📄 document", [
        ("feed", feed.name.clone()),
        ("title", doc.title.clone()),
        ("link", doc.link.clone().unwrap_or_default()),
        ("description", doc.description.clone().unwrap_or_default()),
        ("items", doc.items.len().to_string()),
    ]);

    for item in &doc.items {
        let Some(link) = item.link.as_deref() else {
            report.missing_link += 1;
            log.debug_kv("↩️ skip", [("reason", "no-link".to_string()), ("title", item.title.clone())]);
            continue;
        };

        if item.published_at_fallback {
            log.debug_kv("🕒 undated, using ingestion time", [("url", link.to_string())]);
        }
        let post = NewPost {
            feed_id: feed.id,
            url: link.to_string(),
            title: item.title.clone(),
            description: item.description.clone(),
            published_at: item.published_at,
        };
        if store.insert_post_if_absent(&post).await? {
            report.inserted += 1;
            log.debug_kv("➕ insert", [("url", link.to_string()), ("title", item.title.clone())]);
        } else {
            report.skipped += 1;
            log.debug_kv("↩️ skip", [("reason", "duplicate".to_string()), ("url", link.to_string())]);
        }
    }
    Ok(report)
}
