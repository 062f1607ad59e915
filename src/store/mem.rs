//! In-process store with the same semantics as the Postgres one.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{Feed, FeedFollow, FeedListing, NewFeed, NewPost, Post, Store, StoreError, StoreResult, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    feeds: Vec<Feed>,
    follows: Vec<FeedFollow>,
    posts: Vec<Post>,
    fail_follows: bool,
}

fn new_feed_row(feed: &NewFeed) -> Feed {
    let now = Utc::now();
    Feed {
        id: Uuid::new_v4(),
        name: feed.name.clone(),
        url: feed.url.clone(),
        user_id: feed.user_id,
        last_fetched_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct MemStore {
    tables: Mutex<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("mem store mutex poisoned")
    }

    pub fn posts(&self) -> Vec<Post> {
        self.lock().posts.clone()
    }

    pub fn feed(&self, id: Uuid) -> Option<Feed> {
        self.lock().feeds.iter().find(|f| f.id == id).cloned()
    }

    pub fn set_last_fetched(&self, id: Uuid, at: Option<DateTime<Utc>>) {
        if let Some(f) = self.lock().feeds.iter_mut().find(|f| f.id == id) {
            f.last_fetched_at = at;
        }
    }

    /// Seed a feed nobody follows.
    pub async fn create_feed(&self, feed: &NewFeed) -> StoreResult<Feed> {
        let mut t = self.lock();
        if t.feeds.iter().any(|f| f.url == feed.url) {
            return Err(StoreError::AlreadyExists { entity: "feed", key: feed.url.clone() });
        }
        let row = new_feed_row(feed);
        t.feeds.push(row.clone());
        Ok(row)
    }

    /// Make every later follow insert fail as if the database went away.
    pub fn fail_follow_inserts(&self) {
        self.lock().fail_follows = true;
    }

    /// Seed a post with explicit timestamps, bypassing dedup.
    pub fn push_post(&self, post: Post) {
        self.lock().posts.push(post);
    }
}

impl Store for MemStore {
    async fn create_user(&self, name: &str) -> StoreResult<User> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.name == name) {
            return Err(StoreError::AlreadyExists { entity: "user", key: name.to_string() });
        }
        let now = Utc::now();
        let user = User { id: Uuid::new_v4(), name: name.to_string(), created_at: now, updated_at: now };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_name(&self, name: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.name == name).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users = self.lock().users.clone();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn delete_all_users(&self) -> StoreResult<u64> {
        let mut t = self.lock();
        let n = t.users.len() as u64;
        *t = Tables::default();
        Ok(n)
    }

    async fn create_feed_with_follow(&self, feed: &NewFeed) -> StoreResult<(Feed, FeedFollow)> {
        let mut t = self.lock();
        if t.feeds.iter().any(|f| f.url == feed.url) {
            return Err(StoreError::AlreadyExists { entity: "feed", key: feed.url.clone() });
        }
        if t.fail_follows {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let row = new_feed_row(feed);
        let edge = FeedFollow { user_id: feed.user_id, feed_id: row.id, created_at: row.created_at };
        t.feeds.push(row.clone());
        t.follows.push(edge.clone());
        Ok((row, edge))
    }

    async fn get_feed_by_url(&self, url: &str) -> StoreResult<Option<Feed>> {
        Ok(self.lock().feeds.iter().find(|f| f.url == url).cloned())
    }

    async fn list_feeds(&self) -> StoreResult<Vec<FeedListing>> {
        let t = self.lock();
        let rows = t
            .feeds
            .iter()
            .map(|f| FeedListing {
                id: f.id,
                name: f.name.clone(),
                url: f.url.clone(),
                owner_name: t.users.iter().find(|u| u.id == f.user_id).map(|u| u.name.clone()).unwrap_or_default(),
                last_fetched_at: f.last_fetched_at,
            })
            .collect();
        Ok(rows)
    }

    async fn claim_next_feed(&self, now: DateTime<Utc>, min_age: Duration) -> StoreResult<Option<Feed>> {
        let mut t = self.lock();
        let cutoff = now.checked_sub_signed(min_age);
        // Option orders None first, which is NULLS FIRST.
        let next = t
            .feeds
            .iter_mut()
            .filter(|f| match (f.last_fetched_at, cutoff) {
                (None, _) => true,
                (Some(at), Some(cutoff)) => at < cutoff,
                (Some(_), None) => false,
            })
            .min_by(|a, b| (a.last_fetched_at, a.id).cmp(&(b.last_fetched_at, b.id)));
        Ok(next.map(|f| {
            f.last_fetched_at = Some(now);
            f.updated_at = now;
            f.clone()
        }))
    }

    async fn insert_post_if_absent(&self, post: &NewPost) -> StoreResult<bool> {
        let mut t = self.lock();
        if t.posts.iter().any(|p| p.url == post.url) {
            return Ok(false);
        }
        let now = Utc::now();
        t.posts.push(Post {
            id: Uuid::new_v4(),
            feed_id: post.feed_id,
            url: post.url.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            published_at: post.published_at,
            created_at: now,
            updated_at: now,
        });
        Ok(true)
    }

    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> StoreResult<FeedFollow> {
        let mut t = self.lock();
        if t.fail_follows {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        if t.follows.iter().any(|ff| ff.user_id == user_id && ff.feed_id == feed_id) {
            return Err(StoreError::AlreadyExists { entity: "follow", key: format!("{user_id}/{feed_id}") });
        }
        let edge = FeedFollow { user_id, feed_id, created_at: Utc::now() };
        t.follows.push(edge.clone());
        Ok(edge)
    }

    async fn delete_follow(&self, user_id: Uuid, feed_id: Uuid) -> StoreResult<bool> {
        let mut t = self.lock();
        let before = t.follows.len();
        t.follows.retain(|ff| !(ff.user_id == user_id && ff.feed_id == feed_id));
        Ok(t.follows.len() < before)
    }

    async fn list_follows_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Feed>> {
        let t = self.lock();
        let mut feeds: Vec<Feed> = t
            .feeds
            .iter()
            .filter(|f| t.follows.iter().any(|ff| ff.user_id == user_id && ff.feed_id == f.id))
            .cloned()
            .collect();
        feeds.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(feeds)
    }

    async fn list_recent_posts_for_user(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Post>> {
        let t = self.lock();
        let mut posts: Vec<Post> = t
            .posts
            .iter()
            .filter(|p| t.follows.iter().any(|ff| ff.user_id == user_id && ff.feed_id == p.feed_id))
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }
}
