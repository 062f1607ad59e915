//! Narrow query interface over users, feeds, follows and posts.
//!
//! Everything above this module talks to the datastore through [`Store`];
//! [`PgStore`] is the production implementation.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

mod pg;
pub mod types;

#[cfg(test)]
pub mod mem;

pub use pg::PgStore;
pub use types::{Feed, FeedFollow, FeedListing, NewFeed, NewPost, Post, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: &'static str, key: String },
    #[error("datastore error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait Store {
    async fn create_user(&self, name: &str) -> StoreResult<User>;
    async fn get_user_by_name(&self, name: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Bulk reset. Feeds, follows and posts go with their owners.
    async fn delete_all_users(&self) -> StoreResult<u64>;

    /// Insert the feed and its owner's follow edge as one unit: either both
    /// rows exist afterwards or neither does.
    async fn create_feed_with_follow(&self, feed: &NewFeed) -> StoreResult<(Feed, FeedFollow)>;
    async fn get_feed_by_url(&self, url: &str) -> StoreResult<Option<Feed>>;
    async fn list_feeds(&self) -> StoreResult<Vec<FeedListing>>;

    /// Atomically pick the least recently fetched feed and stamp it with `now`.
    ///
    /// Never-fetched feeds come first, ties go to the smaller id. A feed is
    /// only eligible when it was last fetched strictly before `now - min_age`,
    /// so two workers claiming with the same window can never both get the
    /// same feed. When `now - min_age` falls outside the representable range
    /// only never-fetched feeds are eligible.
    async fn claim_next_feed(&self, now: DateTime<Utc>, min_age: Duration) -> StoreResult<Option<Feed>>;

    /// Returns `false` when a post with the same url already exists.
    async fn insert_post_if_absent(&self, post: &NewPost) -> StoreResult<bool>;

    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> StoreResult<FeedFollow>;
    async fn delete_follow(&self, user_id: Uuid, feed_id: Uuid) -> StoreResult<bool>;
    async fn list_follows_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Feed>>;

    /// Newest posts across the user's followed feeds, bounded by `limit`.
    async fn list_recent_posts_for_user(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Post>>;
}
