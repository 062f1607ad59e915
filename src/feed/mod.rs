use anyhow::Result;
use chrono::Utc;
use clap::Args;
use thiserror::Error;
use tracing::Instrument;
use url::Url;

use crate::store::{Feed, FeedFollow, NewFeed, Store, StoreError, User};
use crate::telemetry::{self};
use crate::telemetry::ops::feed::Phase as FeedPhase;
use crate::util::time::ago;

pub mod types;

/// gator addfeed <name> <url>
#[derive(Args, Debug)]
pub struct AddFeedCmd {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed url {0:?}: expected an absolute http(s) url")]
    InvalidUrl(String),
    #[error("feed name must not be empty")]
    EmptyName,
    #[error("a feed with url {0} is already registered")]
    AlreadyExists(String),
    #[error(transparent)]
    Store(StoreError),
}

/// Register a feed owned by `user` and subscribe them to it.
pub async fn add_feed<S: Store>(store: &S, user: &User, name: &str, url: &str) -> Result<(Feed, FeedFollow), FeedError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FeedError::EmptyName);
    }
    // URL validation (friendly error before DB I/O)
    match Url::parse(url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        _ => return Err(FeedError::InvalidUrl(url.to_string())),
    }

    let log = telemetry::feed();
    let (feed, edge) = store
        .create_feed_with_follow(&NewFeed { name: name.to_string(), url: url.to_string(), user_id: user.id })
        .instrument(log.span(&FeedPhase::Add))
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists { .. } => FeedError::AlreadyExists(url.to_string()),
            other => FeedError::Store(other),
        })?;
    Ok((feed, edge))
}

pub async fn add<S: Store>(store: &S, user: &User, args: AddFeedCmd) -> Result<()> {
    let log = telemetry::feed();
    let _g = log.root_span_kv([
        ("user", user.name.clone()),
        ("name", args.name.clone()),
        ("url", args.url.clone()),
    ]).entered();

    let (feed, _edge) = add_feed(store, user, &args.name, &args.url).await?;
    log.info(format!("➕ Feed added: {} ({})", feed.name, feed.url));
    log.info(format!("   {} is now following it", user.name));
    if telemetry::config::json_mode() {
        log.result(&types::FeedAddResult { feed: &feed, followed_by: &user.name })?;
    }
    Ok(())
}

pub async fn ls<S: Store>(store: &S) -> Result<()> {
    let log = telemetry::feed();
    let feeds = store.list_feeds().instrument(log.span(&FeedPhase::List)).await?;
    if feeds.is_empty() {
        log.info("ℹ️  No feeds registered. Add one with `gator addfeed <name> <url>`.");
    } else {
        log.info("📡 Feeds:");
    }
    let now = Utc::now();
    for row in &feeds {
        log.info(format!(
            "* {} ({}) owner={} fetched={}",
            row.name, row.url, row.owner_name, ago(row.last_fetched_at, now)
        ));
    }
    if telemetry::config::json_mode() {
        log.result(&types::FeedList { feeds: &feeds })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemStore;

    #[tokio::test]
    async fn add_feed_auto_follows_for_owner() {
        let store = MemStore::new();
        let user = store.create_user("kahya").await.unwrap();

        let (feed, edge) = add_feed(&store, &user, "Hacker News", "https://news.ycombinator.com/rss").await.unwrap();

        assert_eq!(feed.user_id, user.id);
        assert_eq!(feed.last_fetched_at, None);
        assert_eq!((edge.user_id, edge.feed_id), (user.id, feed.id));
        assert_eq!(store.list_follows_for_user(user.id).await.unwrap(), vec![feed]);
    }

    #[tokio::test]
    async fn duplicate_url_is_already_exists() {
        let store = MemStore::new();
        let a = store.create_user("a").await.unwrap();
        let b = store.create_user("b").await.unwrap();
        add_feed(&store, &a, "HN", "https://news.ycombinator.com/rss").await.unwrap();

        let err = add_feed(&store, &b, "HN again", "https://news.ycombinator.com/rss").await.unwrap_err();
        assert!(matches!(err, FeedError::AlreadyExists(_)));
        assert_eq!(store.list_feeds().await.unwrap().len(), 1);
        assert!(store.list_follows_for_user(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_follow_leaves_no_orphan_feed() {
        let store = MemStore::new();
        let user = store.create_user("kahya").await.unwrap();
        store.fail_follow_inserts();

        let err = add_feed(&store, &user, "HN", "https://news.ycombinator.com/rss").await.unwrap_err();

        assert!(matches!(err, FeedError::Store(StoreError::Database(_))));
        assert!(store.list_feeds().await.unwrap().is_empty());
        assert!(store.list_follows_for_user(user.id).await.unwrap().is_empty());
        assert!(store.get_feed_by_url("https://news.ycombinator.com/rss").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_bad_input_before_touching_the_store() {
        let store = MemStore::new();
        let user = store.create_user("kahya").await.unwrap();

        assert!(matches!(add_feed(&store, &user, "x", "not a url").await, Err(FeedError::InvalidUrl(_))));
        assert!(matches!(add_feed(&store, &user, "x", "ftp://example.com/rss").await, Err(FeedError::InvalidUrl(_))));
        assert!(matches!(add_feed(&store, &user, "  ", "https://example.com/rss").await, Err(FeedError::EmptyName)));
        assert!(store.list_feeds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_includes_owner_name() {
        let store = MemStore::new();
        let user = store.create_user("kahya").await.unwrap();
        add_feed(&store, &user, "Lanes Blog", "https://wagslane.dev/index.xml").await.unwrap();

        let feeds = store.list_feeds().await.unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].owner_name, "kahya");
        assert_eq!(feeds[0].name, "Lanes Blog");
    }
}
