use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    /// Creator of the feed. Informational only; anyone may follow it.
    pub user_id: Uuid,
    /// `None` until the scheduler claims the feed for the first time.
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of `gator feeds`: a feed joined with its owner's name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeedListing {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub owner_name: String,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FeedFollow {
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeed {
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub feed_id: Uuid,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
}
