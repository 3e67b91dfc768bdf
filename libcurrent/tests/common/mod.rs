//! Local stub of the Bluesky XRPC endpoints
//!
//! Each test spawns its own stub on an ephemeral port and points the client
//! at `stub.xrpc_url()`. The stub records every request it receives and can
//! be told to answer a method with an error status.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use libcurrent::config::BlueskyConfig;

pub const HANDLE: &str = "alice.test";
pub const PASSWORD: &str = "correct-app-password";
pub const DID: &str = "did:plc:alice";
pub const ACCESS_JWT: &str = "access-token";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct StubState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    failures: Arc<Mutex<HashMap<String, u16>>>,
    handles: Arc<Mutex<HashMap<String, String>>>,
}

impl StubState {
    fn record(&self, method: &str, headers: &HeaderMap, body: Value) {
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded {
            method: method.to_string(),
            authorization,
            body,
        });
    }

    fn failure(&self, method: &str) -> Option<Response> {
        let status = *self.failures.lock().unwrap().get(method)?;
        let status = StatusCode::from_u16(status).unwrap();
        Some(
            (
                status,
                Json(json!({"error": "InvalidRequest", "message": "stubbed failure"})),
            )
                .into_response(),
        )
    }
}

pub struct XrpcStub {
    pub base_url: String,
    pub state: StubState,
}

impl XrpcStub {
    pub async fn spawn() -> Self {
        let state = StubState::default();

        let app = Router::new()
            .route("/xrpc/com.atproto.server.createSession", post(create_session))
            .route("/xrpc/com.atproto.repo.createRecord", post(create_record))
            .route("/xrpc/com.atproto.repo.deleteRecord", post(delete_record))
            .route(
                "/xrpc/com.atproto.identity.resolveHandle",
                get(resolve_handle),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// XRPC base without a trailing slash, exercising the config normalization
    pub fn xrpc_url(&self) -> String {
        format!("{}/xrpc", self.base_url)
    }

    pub fn config(&self) -> BlueskyConfig {
        self.config_with_password(PASSWORD)
    }

    pub fn config_with_password(&self, password: &str) -> BlueskyConfig {
        let mut config = BlueskyConfig::new(HANDLE, password);
        config.xrpc_url = self.xrpc_url();
        config.timeout_secs = 5;
        config
    }

    pub fn add_handle(&self, handle: &str, did: &str) {
        self.state
            .handles
            .lock()
            .unwrap()
            .insert(handle.to_string(), did.to_string());
    }

    /// Answer `method` (e.g. "createRecord") with `status` from now on
    pub fn fail(&self, method: &str, status: u16) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(method.to_string(), status);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, method: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method)
            .collect()
    }
}

async fn create_session(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("createSession", &headers, body.clone());

    if body["identifier"] != HANDLE || body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "AuthenticationRequired",
                "message": "Invalid identifier or password"
            })),
        )
            .into_response();
    }

    Json(json!({
        "did": DID,
        "handle": HANDLE,
        "accessJwt": ACCESS_JWT,
        "refreshJwt": "refresh-token"
    }))
    .into_response()
}

async fn create_record(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("createRecord", &headers, body);
    if let Some(response) = state.failure("createRecord") {
        return response;
    }

    let count = state
        .requests
        .lock()
        .unwrap()
        .iter()
        .filter(|request| request.method == "createRecord")
        .count();

    Json(json!({
        "uri": format!("at://{}/app.bsky.feed.post/rkey{}", DID, count),
        "cid": "bafyreistub"
    }))
    .into_response()
}

async fn delete_record(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("deleteRecord", &headers, body);
    if let Some(response) = state.failure("deleteRecord") {
        return response;
    }

    Json(json!({})).into_response()
}

async fn resolve_handle(
    State(state): State<StubState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let handle = params.get("handle").cloned().unwrap_or_default();
    state.record("resolveHandle", &headers, json!({ "handle": handle }));

    match state.handles.lock().unwrap().get(&handle) {
        Some(did) => Json(json!({ "did": did })).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "InvalidRequest", "message": "Unable to resolve handle"})),
        )
            .into_response(),
    }
}
