//! User ↔ feed subscription edges and the timeline query.
//!
//! Ownership and following are independent: any user may follow any
//! registered feed, and the owner of a feed may unfollow it.

use thiserror::Error;

use crate::store::{Feed, FeedFollow, Post, Store, StoreError, User};

pub const DEFAULT_TIMELINE_LIMIT: i64 = 2;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already following {0}")]
    AlreadyFollowing(String),
    #[error("limit must be positive, got {0}")]
    InvalidLimit(i64),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for GraphError {
    fn from(e: StoreError) -> Self {
        GraphError::Store(e)
    }
}

pub async fn follow<S: Store>(store: &S, user: &User, feed_url: &str) -> Result<(Feed, FeedFollow), GraphError> {
    let feed = store
        .get_feed_by_url(feed_url)
        .await?
        .ok_or_else(|| GraphError::NotFound(format!("no feed registered for {feed_url}")))?;
    let edge = store.create_follow(user.id, feed.id).await.map_err(|e| match e {
        StoreError::AlreadyExists { .. } => GraphError::AlreadyFollowing(feed_url.to_string()),
        other => GraphError::Store(other),
    })?;
    Ok((feed, edge))
}

pub async fn unfollow<S: Store>(store: &S, user: &User, feed_url: &str) -> Result<Feed, GraphError> {
    let not_following = || GraphError::NotFound(format!("{} is not following {feed_url}", user.name));
    let feed = store.get_feed_by_url(feed_url).await?.ok_or_else(not_following)?;
    if !store.delete_follow(user.id, feed.id).await? {
        return Err(not_following());
    }
    Ok(feed)
}

pub async fn list_followed<S: Store>(store: &S, user: &User) -> Result<Vec<Feed>, GraphError> {
    Ok(store.list_follows_for_user(user.id).await?)
}

/// Newest posts from the feeds `user` follows: `published_at` desc, then
/// `created_at` desc, then id. The limit is pushed down to the store.
pub async fn timeline<S: Store>(store: &S, user: &User, limit: Option<i64>) -> Result<Vec<Post>, GraphError> {
    let limit = limit.unwrap_or(DEFAULT_TIMELINE_LIMIT);
    if limit <= 0 {
        return Err(GraphError::InvalidLimit(limit));
    }
    Ok(store.list_recent_posts_for_user(user.id, limit).await?)
}
