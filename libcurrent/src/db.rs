//! Database operations for Current
//!
//! Posts live in a single SQLite table keyed by their creation timestamp.
//! The schema is versioned through `PRAGMA user_version`: every entry of
//! [`MIGRATIONS`] moves the version up by exactly one, inside the same
//! transaction as its DDL, so a database created by any earlier release is
//! upgraded step by step to the latest schema.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::error::{DbError, Result};
use crate::types::Post;

/// Schema migrations, applied in order. Entry `n` upgrades version `n` to `n + 1`.
///
/// Never edit or reorder an entry that has shipped; append a new one instead.
pub const MIGRATIONS: &[&[&str]] = &[
    // 0 -> 1: posts keyed by Unix timestamp
    &["CREATE TABLE IF NOT EXISTS posts(ts INTEGER PRIMARY KEY, content TEXT)"],
    // 1 -> 2: Bluesky record URI, kept for remote deletion
    &["ALTER TABLE posts ADD bsky_uri TEXT"],
];

/// Latest schema version known to this build
pub fn latest_schema_version() -> i64 {
    MIGRATIONS.len() as i64
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `db_path` and migrate it
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
            }
        }

        // mode=rwc creates the file on first use
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and migrate it
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Access the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Current value of `PRAGMA user_version`
    pub async fn schema_version(&self) -> Result<i64> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        Ok(version)
    }

    /// Apply every pending migration and return the resulting schema version
    ///
    /// Each migration runs in its own transaction together with the version
    /// bump, so a failure leaves the database at the last fully applied
    /// version. Running it again on an up-to-date database is a no-op.
    pub async fn migrate(&self) -> Result<i64> {
        let mut version = self.schema_version().await?;
        let latest = latest_schema_version();

        if version < 0 {
            return Err(DbError::InvalidSchemaVersion(version).into());
        }

        if version > latest {
            tracing::warn!(
                version,
                latest,
                "Database schema is newer than this build, skipping migrations"
            );
            return Ok(version);
        }

        for (index, statements) in MIGRATIONS.iter().enumerate().skip(version as usize) {
            let next = index as i64 + 1;
            let mut tx = self.pool.begin().await.map_err(DbError::SqlxError)?;

            for statement in statements.iter() {
                sqlx::query(statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::SqlxError)?;
            }

            // PRAGMA does not accept bound parameters
            sqlx::query(&format!("PRAGMA user_version = {}", next))
                .execute(&mut *tx)
                .await
                .map_err(DbError::SqlxError)?;

            tx.commit().await.map_err(DbError::SqlxError)?;

            tracing::info!(from = version, to = next, "Applied database migration");
            version = next;
        }

        Ok(version)
    }

    /// Store a new post
    ///
    /// Fails with [`DbError::DuplicateId`] when a post already exists for the
    /// same second.
    pub async fn insert(&self, post: &Post) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (ts, content, bsky_uri)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(post.id)
        .bind(&post.content)
        .bind(post.remote_uri.as_deref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation()
                    || db_err.message().contains("UNIQUE constraint failed") =>
            {
                Err(DbError::DuplicateId(post.id).into())
            }
            Err(e) => Err(DbError::SqlxError(e).into()),
        }
    }

    /// Delete a post, returning whether a row was removed
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE ts = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a post by its timestamp id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT ts, CAST(content AS TEXT) AS content, CAST(bsky_uri AS TEXT) AS bsky_uri FROM posts WHERE ts = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        row.as_ref().map(post_from_row).transpose()
    }

    /// Posts with `start <= ts < end`, newest first
    pub async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT ts, CAST(content AS TEXT) AS content, CAST(bsky_uri AS TEXT) AS bsky_uri
            FROM posts
            WHERE ? <= ts AND ts < ?
            ORDER BY ts DESC
            "#,
        )
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    /// Posts created on the given UTC calendar day, newest first
    pub async fn find_on_date(&self, date: NaiveDate) -> Result<Vec<Post>> {
        let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        self.find_by_date_range(start, start + Duration::hours(24))
            .await
    }

    /// One page of posts, newest first, optionally filtered by a content substring
    ///
    /// Pages are 1-based; callers clamp page numbers below 1 before calling.
    pub async fn find_page(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<Vec<Post>> {
        let offset = i64::from(page_size) * (i64::from(page) - 1);

        let rows = match search.filter(|s| !s.is_empty()) {
            Some(term) => {
                sqlx::query(
                    r#"
                    SELECT ts, CAST(content AS TEXT) AS content, CAST(bsky_uri AS TEXT) AS bsky_uri
                    FROM posts
                    WHERE content LIKE '%' || ? || '%'
                    ORDER BY ts DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(term)
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT ts, CAST(content AS TEXT) AS content, CAST(bsky_uri AS TEXT) AS bsky_uri
                    FROM posts
                    ORDER BY ts DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    /// Number of posts whose content contains `search` (all posts when `None`)
    pub async fn count(&self, search: Option<&str>) -> Result<i64> {
        let count: i64 = match search.filter(|s| !s.is_empty()) {
            Some(term) => {
                sqlx::query_scalar("SELECT COUNT(ts) FROM posts WHERE content LIKE '%' || ? || '%'")
                    .bind(term)
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(ts) FROM posts")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(DbError::SqlxError)?;

        Ok(count)
    }
}

/// Map a row selected with text casts of `content` and `bsky_uri`
///
/// Older releases wrote both columns as BLOBs, hence the casts in every SELECT.
fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let id: i64 = row.try_get("ts").map_err(DbError::SqlxError)?;
    let content: Option<String> = row.try_get("content").map_err(DbError::SqlxError)?;
    let remote_uri: Option<String> = row.try_get("bsky_uri").map_err(DbError::SqlxError)?;

    Ok(Post {
        id,
        content: content.unwrap_or_default(),
        // Unfederated posts were stored with an empty URI
        remote_uri: remote_uri.filter(|uri| !uri.is_empty()),
    })
}
