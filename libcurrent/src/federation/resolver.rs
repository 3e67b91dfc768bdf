//! Handle to DID resolution

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::BlueskyConfig;
use crate::error::Result;

/// Resolves a Bluesky handle (without the leading `@`) to a DID
///
/// Resolution is best-effort: every failure is reported as `None` and the
/// mention is simply left as plain text.
#[async_trait]
pub trait HandleResolver: Send + Sync {
    async fn resolve(&self, handle: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

/// Resolver backed by `com.atproto.identity.resolveHandle`
#[derive(Clone)]
pub struct XrpcHandleResolver {
    client: reqwest::Client,
    xrpc_base: String,
}

impl XrpcHandleResolver {
    pub fn new(client: reqwest::Client, xrpc_base: impl Into<String>) -> Self {
        Self {
            client,
            xrpc_base: xrpc_base.into(),
        }
    }

    pub fn from_config(config: &BlueskyConfig) -> Result<Self> {
        let client = super::http_client(config.timeout_secs)?;
        Ok(Self::new(client, config.xrpc_base()))
    }
}

#[async_trait]
impl HandleResolver for XrpcHandleResolver {
    async fn resolve(&self, handle: &str) -> Option<String> {
        let url = format!("{}com.atproto.identity.resolveHandle", self.xrpc_base);

        let response = match self
            .client
            .get(&url)
            .query(&[("handle", handle)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(handle = %handle, error = %e, "resolveHandle request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                handle = %handle,
                status = response.status().as_u16(),
                "resolveHandle rejected"
            );
            return None;
        }

        match response.json::<ResolveHandleResponse>().await {
            Ok(body) if !body.did.is_empty() => Some(body.did),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(handle = %handle, error = %e, "resolveHandle returned malformed body");
                None
            }
        }
    }
}
