//! Bluesky federation client

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::facets::{Facet, FacetParser};
use super::resolver::{HandleResolver, XrpcHandleResolver};
use super::session::{Session, SessionManager};
use super::{Federation, POST_COLLECTION};
use crate::config::BlueskyConfig;
use crate::error::{FederationError, Result};

#[derive(Debug, Serialize)]
struct PostRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'static str,
    text: &'a str,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(skip_serializing_if = "<[Facet]>::is_empty")]
    facets: &'a [Facet],
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'static str,
    record: PostRecord<'a>,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

#[derive(Debug, Serialize)]
struct DeleteRecordRequest<'a> {
    repo: &'a str,
    collection: &'static str,
    rkey: &'a str,
}

/// Record key of an `at://` URI: everything after the last `/`
pub fn record_key(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

pub struct BlueskyClient {
    client: reqwest::Client,
    xrpc_base: String,
    sessions: SessionManager,
    parser: FacetParser,
}

impl BlueskyClient {
    /// Create a client that resolves mentions through the same XRPC endpoint
    pub fn new(config: &BlueskyConfig) -> Result<Self> {
        let client = super::http_client(config.timeout_secs)?;
        let resolver = Arc::new(XrpcHandleResolver::new(client.clone(), config.xrpc_base()));
        Ok(Self::with_parts(client, config, resolver))
    }

    /// Create a client with a custom handle resolver
    pub fn with_resolver(config: &BlueskyConfig, resolver: Arc<dyn HandleResolver>) -> Result<Self> {
        let client = super::http_client(config.timeout_secs)?;
        Ok(Self::with_parts(client, config, resolver))
    }

    fn with_parts(
        client: reqwest::Client,
        config: &BlueskyConfig,
        resolver: Arc<dyn HandleResolver>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(client.clone(), config),
            parser: FacetParser::new(resolver).with_emphasis_stripping(config.strip_emphasis),
            xrpc_base: config.xrpc_base(),
            client,
        }
    }

    /// POST a JSON body to an XRPC procedure with the session's bearer token
    async fn procedure<T: Serialize + ?Sized>(
        &self,
        method: &'static str,
        session: &Session,
        body: &T,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.xrpc_base, method);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, session.bearer())
            .json(body)
            .send()
            .await
            .map_err(|e| FederationError::Network(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                method = method,
                status = status.as_u16(),
                body = %body,
                "Bluesky rejected request"
            );
            return Err(FederationError::Rejected {
                operation: method,
                status: status.as_u16(),
            }
            .into());
        }

        Ok(response)
    }
}

#[async_trait]
impl Federation for BlueskyClient {
    async fn create_post(&self, content: &str, created_at: DateTime<Utc>) -> Result<String> {
        let session = self.sessions.create_session().await?;
        let parsed = self.parser.parse(content).await;

        let request = CreateRecordRequest {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: PostRecord {
                record_type: POST_COLLECTION,
                text: &parsed.text,
                created_at: created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                facets: &parsed.facets,
            },
        };

        tracing::debug!(
            repo = %session.did,
            bytes = parsed.text.len(),
            facets = parsed.facets.len(),
            "Creating Bluesky post record"
        );

        let response = self
            .procedure("com.atproto.repo.createRecord", &session, &request)
            .await?;

        let created: CreateRecordResponse = response.json().await.map_err(|e| {
            FederationError::InvalidResponse(format!("Failed to decode createRecord response: {}", e))
        })?;

        tracing::debug!(uri = %created.uri, "Posted to Bluesky");
        Ok(created.uri)
    }

    async fn delete_post(&self, uri: &str) -> Result<()> {
        let session = self.sessions.create_session().await?;

        let request = DeleteRecordRequest {
            repo: &session.did,
            collection: POST_COLLECTION,
            rkey: record_key(uri),
        };

        self.procedure("com.atproto.repo.deleteRecord", &session, &request)
            .await?;

        tracing::debug!(uri = %uri, "Deleted Bluesky post record");
        Ok(())
    }

    fn name(&self) -> &str {
        "bluesky"
    }
}
