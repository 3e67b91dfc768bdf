//! Posting service: create and delete posts across the local store and Bluesky
//!
//! The local row and its federated copy are kept consistent by ordering:
//!
//! - on create, the remote record is written first and the local row only
//!   once the remote URI is known;
//! - on delete, the remote record is removed first and the local row is kept
//!   when that fails, so no remote record is ever left without a local trace.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{ConfigError, CurrentError, DbError, Result};
use crate::federation::Federation;
use crate::{Database, Post};

/// Posting service
#[derive(Clone)]
pub struct PostingService {
    db: Arc<Database>,
    federation: Option<Arc<dyn Federation>>,
}

impl PostingService {
    /// Create a posting service; `federation` is `None` when Bluesky is not configured
    pub fn new(db: Arc<Database>, federation: Option<Arc<dyn Federation>>) -> Self {
        Self { db, federation }
    }

    fn federation(&self) -> Result<&Arc<dyn Federation>> {
        self.federation
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField("bluesky".to_string()).into())
    }

    /// Create a post stamped with the current time
    ///
    /// # Errors
    ///
    /// - `CurrentError::InvalidInput` for empty content
    /// - `DbError::DuplicateId` when a post already exists for this second
    /// - any `FederationError` when `federate` is set and the remote call fails;
    ///   nothing is stored in that case
    /// - `CurrentError::FederatedButNotStored` when the remote record was
    ///   created but the local insert failed
    pub async fn create_post(&self, content: &str, federate: bool) -> Result<Post> {
        self.create_post_at(content, federate, Utc::now()).await
    }

    /// Create a post stamped with `created_at`
    pub async fn create_post_at(
        &self,
        content: &str,
        federate: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Post> {
        if content.trim().is_empty() {
            return Err(CurrentError::InvalidInput(
                "Post content cannot be empty".to_string(),
            ));
        }

        let id = created_at.timestamp();

        // Checked before federating so a collision never leaves an orphaned remote record
        if self.db.find_by_id(id).await?.is_some() {
            return Err(DbError::DuplicateId(id).into());
        }

        let remote_uri = if federate {
            let federation = self.federation()?;
            federation.validate_content(content)?;

            let uri = federation.create_post(content, created_at).await?;
            tracing::info!(id, uri = %uri, "Federated post");
            Some(uri)
        } else {
            None
        };

        let post = Post::new(content.to_string(), created_at, remote_uri);

        match self.db.insert(&post).await {
            Ok(()) => {
                tracing::info!(id = post.id, federated = post.is_federated(), "Stored post");
                Ok(post)
            }
            Err(CurrentError::Database(source)) if post.remote_uri.is_some() => {
                let uri = post.remote_uri.unwrap_or_default();
                tracing::error!(
                    id = post.id,
                    uri = %uri,
                    error = %source,
                    "Post federated but not stored locally"
                );
                Err(CurrentError::FederatedButNotStored { uri, source })
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a post
    ///
    /// With `federate`, a post that has a remote URI is deleted remotely
    /// first; if that fails the error is returned and the local row is kept.
    /// Posts without a remote URI, or ids that do not exist, skip the remote
    /// call. Deleting an unknown id is not an error.
    pub async fn delete_post(&self, id: i64, federate: bool) -> Result<()> {
        if federate {
            let remote_uri = self
                .db
                .find_by_id(id)
                .await?
                .and_then(|post| post.remote_uri)
                .filter(|uri| !uri.is_empty());

            match remote_uri {
                Some(uri) => {
                    self.federation()?.delete_post(&uri).await?;
                    tracing::info!(id, uri = %uri, "Deleted federated copy");
                }
                None => {
                    tracing::debug!(id, "No federated copy to delete");
                }
            }
        }

        if self.db.delete(id).await? {
            tracing::info!(id, "Deleted post");
        } else {
            tracing::debug!(id, "No stored post to delete");
        }

        Ok(())
    }
}
