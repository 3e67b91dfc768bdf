//! Core types for Current

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A stored micro-blog post.
///
/// `id` is the creation time in Unix seconds and doubles as the primary key,
/// so two posts created within the same second collide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub content: String,
    pub remote_uri: Option<String>,
}

impl Post {
    /// Create a post stamped with `created_at`, truncated to the second.
    pub fn new(content: String, created_at: DateTime<Utc>, remote_uri: Option<String>) -> Self {
        Self {
            id: created_at.timestamp(),
            content,
            remote_uri,
        }
    }

    /// Creation time of the post (UTC).
    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.id, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Whether the post has a federated copy that can be deleted remotely.
    pub fn is_federated(&self) -> bool {
        self.remote_uri.as_deref().is_some_and(|uri| !uri.is_empty())
    }
}

/// One page of posts, newest first, with neighbouring page numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: u32,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl PostPage {
    /// Build a page from its posts and the total number of matching posts.
    pub fn new(posts: Vec<Post>, page: u32, page_size: u32, total: i64) -> Self {
        let prev_page = (page > 1).then(|| page - 1);
        let next_page = (total > i64::from(page) * i64::from(page_size)).then(|| page + 1);

        Self {
            posts,
            page,
            prev_page,
            next_page,
        }
    }
}
