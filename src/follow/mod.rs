use anyhow::Result;
use clap::Args;
use tracing::Instrument;

use crate::store::{Store, User};
use crate::telemetry::{self};
use crate::telemetry::ops::follow::Phase as FollowPhase;

pub mod graph;
pub mod types;

pub use graph::DEFAULT_TIMELINE_LIMIT;

/// gator follow <url>
#[derive(Args, Debug)]
pub struct FollowCmd {
    pub url: String,
}

/// gator unfollow <url>
#[derive(Args, Debug)]
pub struct UnfollowCmd {
    pub url: String,
}

/// gator browse [limit]
#[derive(Args, Debug)]
pub struct BrowseCmd {
    /// Number of posts to show (default: 2)
    pub limit: Option<i64>,
}

pub async fn follow<S: Store>(store: &S, user: &User, args: FollowCmd) -> Result<()> {
    let log = telemetry::follow();
    let _g = log.root_span_kv([("user", user.name.clone()), ("url", args.url.clone())]).entered();
    let (feed, _edge) = graph::follow(store, user, &args.url)
        .instrument(log.span(&FollowPhase::Follow))
        .await?;
    log.info(format!("➕ {} now follows {} ({})", user.name, feed.name, feed.url));
    if telemetry::config::json_mode() {
        log.result(&types::FollowResult { user: &user.name, feed_name: &feed.name, feed_url: &feed.url })?;
    }
    Ok(())
}

pub async fn unfollow<S: Store>(store: &S, user: &User, args: UnfollowCmd) -> Result<()> {
    let log = telemetry::follow();
    let _g = log.root_span_kv([("user", user.name.clone()), ("url", args.url.clone())]).entered();
    let feed = graph::unfollow(store, user, &args.url)
        .instrument(log.span(&FollowPhase::Unfollow))
        .await?;
    log.info(format!("➖ {} unfollowed {} ({})", user.name, feed.name, feed.url));
    if telemetry::config::json_mode() {
        log.result(&types::FollowResult { user: &user.name, feed_name: &feed.name, feed_url: &feed.url })?;
    }
    Ok(())
}

pub async fn following<S: Store>(store: &S, user: &User) -> Result<()> {
    let log = telemetry::follow();
    let feeds = graph::list_followed(store, user)
        .instrument(log.span(&FollowPhase::List))
        .await?;
    if feeds.is_empty() {
        log.info(format!("ℹ️  {} is not following any feeds", user.name));
    } else {
        log.info(format!("📡 Feeds followed by {}:", user.name));
        for f in &feeds { log.info(format!("* {} ({})", f.name, f.url)); }
    }
    if telemetry::config::json_mode() {
        log.result(&types::FollowingList { user: &user.name, feeds: &feeds })?;
    }
    Ok(())
}

pub async fn browse<S: Store>(store: &S, user: &User, args: BrowseCmd) -> Result<()> {
    let log = telemetry::follow();
    let limit = args.limit.unwrap_or(DEFAULT_TIMELINE_LIMIT);
    let _g = log.root_span_kv([("user", user.name.clone()), ("limit", limit.to_string())]).entered();
    let posts = graph::timeline(store, user, Some(limit))
        .instrument(log.span(&FollowPhase::Browse))
        .await?;
    if posts.is_empty() {
        log.info("ℹ️  No posts yet. Follow some feeds and run `gator agg`.");
    }
    for p in &posts {
        log.info(format!("{}  {}", p.published_at.format("%Y-%m-%d %H:%M"), p.title));
        log.info(format!("    {}", p.url));
        if let Some(d) = &p.description { log.debug(format!("    {}", d)); }
    }
    if telemetry::config::json_mode() {
        log.result(&types::Timeline { user: &user.name, limit, posts: &posts })?;
    }
    Ok(())
}
