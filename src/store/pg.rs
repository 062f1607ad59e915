use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Feed, FeedFollow, FeedListing, NewFeed, NewPost, Post, Store, StoreError, StoreResult, User};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Map a unique-constraint violation onto AlreadyExists, everything else stays a database error.
fn unique_or(err: sqlx::Error, entity: &'static str, key: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::AlreadyExists { entity, key: key.to_string() };
        }
    }
    StoreError::Database(err)
}

impl Store for PgStore {
    async fn create_user(&self, name: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name)
            VALUES ($1, $2)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or(e, "user", name))
    }

    async fn get_user_by_name(&self, name: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn delete_all_users(&self) -> StoreResult<u64> {
        let res = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    async fn create_feed_with_follow(&self, feed: &NewFeed) -> StoreResult<(Feed, FeedFollow)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (id, name, url, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, url, user_id, last_fetched_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_or(e, "feed", &feed.url))?;

        let edge = sqlx::query_as::<_, FeedFollow>(
            r#"
            INSERT INTO feed_follows (user_id, feed_id)
            VALUES ($1, $2)
            RETURNING user_id, feed_id, created_at
            "#,
        )
        .bind(feed.user_id)
        .bind(row.id)
        .fetch_one(&mut *tx)
        .await?;

        // Dropping tx on any early return above rolls both inserts back.
        tx.commit().await?;
        Ok((row, edge))
    }

    async fn get_feed_by_url(&self, url: &str) -> StoreResult<Option<Feed>> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
            FROM feeds
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    async fn list_feeds(&self) -> StoreResult<Vec<FeedListing>> {
        let rows = sqlx::query_as::<_, FeedListing>(
            r#"
            SELECT f.id, f.name, f.url, u.name AS owner_name, f.last_fetched_at
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at, f.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn claim_next_feed(&self, now: DateTime<Utc>, min_age: Duration) -> StoreResult<Option<Feed>> {
        // Single statement: the row lock taken by the sub-select is held until
        // the UPDATE commits, and SKIP LOCKED sends racing workers to the next row.
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            UPDATE feeds
            SET last_fetched_at = $1,
                updated_at      = $1
            WHERE id = (
                SELECT id
                FROM feeds
                WHERE last_fetched_at IS NULL OR last_fetched_at < $2
                ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, name, url, user_id, last_fetched_at, created_at, updated_at
            "#,
        )
        .bind(now)
        // NULL cutoff: `last_fetched_at < NULL` is never true, so only unfetched feeds match.
        .bind(now.checked_sub_signed(min_age))
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    async fn insert_post_if_absent(&self, post: &NewPost) -> StoreResult<bool> {
        let exec = sqlx::query(
            r#"
            INSERT INTO posts (id, feed_id, url, title, description, published_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post.feed_id)
        .bind(&post.url)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.published_at)
        .execute(&self.pool)
        .await?;
        Ok(exec.rows_affected() == 1)
    }

    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> StoreResult<FeedFollow> {
        sqlx::query_as::<_, FeedFollow>(
            r#"
            INSERT INTO feed_follows (user_id, feed_id)
            VALUES ($1, $2)
            RETURNING user_id, feed_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or(e, "follow", &format!("{user_id}/{feed_id}")))
    }

    async fn delete_follow(&self, user_id: Uuid, feed_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_follows_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Feed>> {
        let feeds = sqlx::query_as::<_, Feed>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.last_fetched_at, f.created_at, f.updated_at
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = $1
            ORDER BY f.name, f.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    async fn list_recent_posts_for_user(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.feed_id, p.url, p.title, p.description,
                   p.published_at, p.created_at, p.updated_at
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = $1
            ORDER BY p.published_at DESC, p.created_at DESC, p.id ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}
