//! Mock federation and handle resolver for testing
//!
//! `MockFederation` records every call and can be told to fail creation or
//! deletion, so the posting workflow can be exercised without credentials or
//! network access. `StaticResolver` answers mentions from a fixed table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::resolver::HandleResolver;
use super::Federation;
use crate::error::{FederationError, Result};

/// Configuration for mock federation behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// URI returned by successful creations; `{id}` is replaced by the post's timestamp
    pub uri_template: String,

    /// Error returned by `create_post`, if any
    pub create_error: Option<FederationError>,

    /// Error returned by `delete_post`, if any
    pub delete_error: Option<FederationError>,

    /// Contents passed to `create_post`
    pub created: Arc<Mutex<Vec<String>>>,

    /// URIs passed to `delete_post`
    pub deleted: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            uri_template: "at://did:plc:mock/app.bsky.feed.post/{id}".to_string(),
            create_error: None,
            delete_error: None,
            created: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock federation for testing
pub struct MockFederation {
    config: MockConfig,
}

impl MockFederation {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock federation that always succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a mock federation whose creations fail
    pub fn create_failure(error: FederationError) -> Self {
        Self::new(MockConfig {
            create_error: Some(error),
            ..Default::default()
        })
    }

    /// Create a mock federation whose deletions fail
    pub fn delete_failure(error: FederationError) -> Self {
        Self::new(MockConfig {
            delete_error: Some(error),
            ..Default::default()
        })
    }

    /// Number of `create_post` calls so far
    pub fn create_calls(&self) -> usize {
        self.config.created.lock().unwrap().len()
    }

    /// Number of `delete_post` calls so far
    pub fn delete_calls(&self) -> usize {
        self.config.deleted.lock().unwrap().len()
    }

    /// Contents passed to `create_post`, in call order
    pub fn created_content(&self) -> Vec<String> {
        self.config.created.lock().unwrap().clone()
    }

    /// URIs passed to `delete_post`, in call order
    pub fn deleted_uris(&self) -> Vec<String> {
        self.config.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Federation for MockFederation {
    async fn create_post(&self, content: &str, created_at: DateTime<Utc>) -> Result<String> {
        self.config
            .created
            .lock()
            .unwrap()
            .push(content.to_string());

        if let Some(error) = &self.config.create_error {
            return Err(error.clone().into());
        }

        Ok(self
            .config
            .uri_template
            .replace("{id}", &created_at.timestamp().to_string()))
    }

    async fn delete_post(&self, uri: &str) -> Result<()> {
        self.config.deleted.lock().unwrap().push(uri.to_string());

        if let Some(error) = &self.config.delete_error {
            return Err(error.clone().into());
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Handle resolver answering from a fixed table
#[derive(Debug, Default)]
pub struct StaticResolver {
    handles: HashMap<String, String>,
    lookups: Mutex<Vec<String>>,
}

impl StaticResolver {
    pub fn new(handles: &[(&str, &str)]) -> Self {
        Self {
            handles: handles
                .iter()
                .map(|(handle, did)| (handle.to_string(), did.to_string()))
                .collect(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Handles looked up so far, in call order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl HandleResolver for StaticResolver {
    async fn resolve(&self, handle: &str) -> Option<String> {
        self.lookups.lock().unwrap().push(handle.to_string());
        self.handles.get(handle).cloned()
    }
}
