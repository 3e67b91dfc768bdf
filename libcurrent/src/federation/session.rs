//! Bluesky session creation
//!
//! Sessions are never cached or refreshed: every remote operation starts by
//! exchanging the handle and app password for a fresh access token.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::BlueskyConfig;
use crate::error::{FederationError, Result};

/// An authenticated Bluesky session
#[derive(Debug)]
pub struct Session {
    pub did: String,
    pub access_jwt: SecretString,
    pub refresh_jwt: SecretString,
}

impl Session {
    /// Value of the `Authorization` header for calls made with this session
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_jwt.expose_secret())
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    did: String,
    access_jwt: String,
    refresh_jwt: String,
}

pub struct SessionManager {
    client: reqwest::Client,
    xrpc_base: String,
    handle: String,
    app_password: SecretString,
}

impl SessionManager {
    pub fn new(client: reqwest::Client, config: &BlueskyConfig) -> Self {
        Self {
            client,
            xrpc_base: config.xrpc_base(),
            handle: config.handle.clone(),
            app_password: SecretString::from(config.app_password.expose_secret().to_owned()),
        }
    }

    /// Log in with `com.atproto.server.createSession`
    ///
    /// # Errors
    ///
    /// Returns `FederationError::Authentication` when the request cannot be
    /// sent, the server rejects the credentials or the reply cannot be decoded.
    pub async fn create_session(&self) -> Result<Session> {
        let url = format!("{}com.atproto.server.createSession", self.xrpc_base);
        let request = CreateSessionRequest {
            identifier: &self.handle,
            password: self.app_password.expose_secret(),
        };

        tracing::debug!(handle = %self.handle, "Creating Bluesky session");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                FederationError::Authentication(format!("createSession request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                handle = %self.handle,
                status = status.as_u16(),
                body = %body,
                "Bluesky rejected session credentials"
            );
            return Err(FederationError::Authentication(format!(
                "createSession failed with status code {}",
                status.as_u16()
            ))
            .into());
        }

        let session: CreateSessionResponse = response.json().await.map_err(|e| {
            FederationError::Authentication(format!("Failed to decode createSession response: {}", e))
        })?;

        Ok(Session {
            did: session.did,
            access_jwt: SecretString::from(session.access_jwt),
            refresh_jwt: SecretString::from(session.refresh_jwt),
        })
    }
}
