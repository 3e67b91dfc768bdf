//! Federation of posts to Bluesky
//!
//! A federated post is mirrored to the author's Bluesky repository through
//! the XRPC HTTP API. The pieces, leaf first:
//!
//! - [`facets`]: turns markdown content into rich text with link and mention facets
//! - [`resolver`]: resolves `@handle` mentions to DIDs
//! - [`session`]: obtains a short-lived session for every remote operation
//! - [`bluesky`]: creates and deletes `app.bsky.feed.post` records
//!
//! # Examples
//!
//! ```no_run
//! use chrono::Utc;
//! use libcurrent::config::BlueskyConfig;
//! use libcurrent::federation::{bluesky::BlueskyClient, Federation};
//!
//! # async fn example() -> libcurrent::Result<()> {
//! let config = BlueskyConfig::new("alice.bsky.social", "app-password");
//! let client = BlueskyClient::new(&config)?;
//!
//! let uri = client.create_post("Hello from [current](https://example.com)", Utc::now()).await?;
//! client.delete_post(&uri).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::{FederationError, Result};

pub mod bluesky;
pub mod facets;
pub mod resolver;
pub mod session;

// Mock federation is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Collection (and record `$type`) of Bluesky posts
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Remote network a post can be mirrored to
///
/// Every call is attempted exactly once; implementations do not retry.
#[async_trait]
pub trait Federation: Send + Sync {
    /// Publish `content` as a new remote record and return its URI
    ///
    /// # Errors
    ///
    /// - `FederationError::Authentication` if no session could be obtained
    /// - `FederationError::Network` if the remote could not be reached
    /// - `FederationError::Rejected` if the remote answered with a non-success status
    async fn create_post(&self, content: &str, created_at: DateTime<Utc>) -> Result<String>;

    /// Delete the remote record identified by `uri`
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Federation::create_post`]; a rejection carries the
    /// HTTP status code.
    async fn delete_post(&self, uri: &str) -> Result<()>;

    /// Check content before any remote call is made
    fn validate_content(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(FederationError::Validation("Content cannot be empty".to_string()).into());
        }
        Ok(())
    }

    /// Lowercase name of the remote network (e.g. "bluesky")
    fn name(&self) -> &str;
}

/// Build the HTTP client shared by the XRPC components
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .user_agent(concat!("current/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FederationError::Network(format!("Failed to build HTTP client: {}", e)))?;
    Ok(client)
}
