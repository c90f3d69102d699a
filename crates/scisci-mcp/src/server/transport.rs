//! HTTP transport.
//!
//! `POST /mcp` takes one JSON-RPC request per call. `GET /health` and
//! `GET /ready` are unauthenticated; `/mcp` checks a bearer token when one
//! is configured.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::protocol::{self, JsonRpcRequest};
use crate::tools::{McpTool, ToolContext};

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub tools: Vec<Box<dyn McpTool>>,
    pub ctx: ToolContext,
    /// Bearer token required on `/mcp`, if any.
    pub auth_token: Option<String>,
}

/// Create the HTTP router for MCP.
pub fn create_router(
    tools: Vec<Box<dyn McpTool>>,
    ctx: ToolContext,
    auth_token: Option<String>,
) -> Router {
    let state = Arc::new(HttpState { tools, ctx, auth_token });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/mcp", post(handle_mcp_post))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": protocol::SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "service": protocol::SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "tools": state.tools.len(),
        "openalexPolitePool": state.ctx.openalex.has_email(),
        "dimensionsConfigured": state.ctx.dimensions.has_key()
    }))
}

/// Check `Authorization: Bearer <token>` against the configured token.
fn authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token.trim() == expected)
}

async fn handle_mcp_post(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !authorized(state.auth_token.as_deref(), &headers) {
        tracing::warn!("Rejected MCP request with missing or invalid bearer token");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response();
    }

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return Json(protocol::parse_error(&e)).into_response(),
    };

    match protocol::dispatch(request, &state.tools, &state.ctx).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
