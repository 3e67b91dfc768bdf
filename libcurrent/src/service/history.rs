//! History service for reading stored posts

use chrono::NaiveDate;
use std::sync::Arc;

use crate::{Database, Post, PostPage, Result};

/// History service
///
/// Read side of the blog: single posts, search-filtered pages and the posts
/// of one calendar day.
#[derive(Clone)]
pub struct HistoryService {
    db: Arc<Database>,
    page_size: u32,
}

impl HistoryService {
    pub fn new(db: Arc<Database>, page_size: u32) -> Self {
        Self {
            db,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Get a single post by id
    pub async fn get(&self, id: i64) -> Result<Option<Post>> {
        self.db.find_by_id(id).await
    }

    /// One page of posts, newest first
    ///
    /// Page numbers below 1 are clamped to 1. An empty search term matches
    /// every post.
    pub async fn page(&self, page: i64, search: Option<&str>) -> Result<PostPage> {
        let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);
        let search = search.filter(|term| !term.is_empty());

        let posts = self.db.find_page(page, self.page_size, search).await?;
        let total = self.db.count(search).await?;

        Ok(PostPage::new(posts, page, self.page_size, total))
    }

    /// Posts created on `date` (UTC), newest first
    pub async fn on_date(&self, date: NaiveDate) -> Result<Vec<Post>> {
        self.db.find_on_date(date).await
    }
}
