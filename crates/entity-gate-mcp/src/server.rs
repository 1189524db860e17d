// crates/entity-gate-mcp/src/server.rs
// ============================================================================
// Module: Gate HTTP Server
// Description: JSON-RPC transport, health endpoints, and request framing.
// Purpose: Serve the tool router and status resources over HTTP.
// Dependencies: entity-gate-core, axum, serde_json, tokio
// ============================================================================

//! ## Overview
//! One axum application serves three routes: `POST /mcp` for JSON-RPC 2.0
//! (`initialize`, `tools/list`, `tools/call`, `resources/list`,
//! `resources/read`), `GET /health` for always-OK liveness, and `GET /ready`
//! for readiness. The server only starts after the initial snapshot is in
//! place, so readiness reports the live entity count rather than gating.
//!
//! Bearer credentials travel in the `Authorization` header and are carried
//! into routing via [`RequestContext`]; the transport itself performs no
//! verification. Tool failures map to JSON-RPC errors with stable codes;
//! Layer 4 denials and lookup misses arrive here as ordinary text results.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::sync::watch;

use crate::auth::RequestContext;
use crate::cache::CacheService;
use crate::cache::wall_clock_now;
use crate::resources;
use crate::telemetry::GateMethod;
use crate::telemetry::GateMetricEvent;
use crate::telemetry::GateMetrics;
use crate::telemetry::GateOutcome;
use crate::tools::ToolError;
use crate::tools::ToolName;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC protocol version string.
const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision advertised during initialization.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name advertised during initialization.
const SERVER_NAME: &str = "entity-gate";

// ============================================================================
// SECTION: JSON-RPC Framing
// ============================================================================

/// Incoming JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker; must be "2.0".
    #[serde(default)]
    pub jsonrpc: String,
    /// Request identifier echoed in the response.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name.
    #[serde(default)]
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// Outgoing JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// Protocol marker, always "2.0".
    pub jsonrpc: &'static str,
    /// Request identifier being answered.
    pub id: Option<Value>,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error payload.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Stable error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

impl JsonRpcResponse {
    /// Builds a success response.
    #[must_use]
    pub const fn result(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub const fn error(id: Option<Value>, code: i64, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
            }),
        }
    }
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Deserialize)]
struct ToolsCallParams {
    /// Tool wire name.
    name: String,
    /// Tool arguments object.
    #[serde(default)]
    arguments: Option<Value>,
}

/// Parameters of a `resources/read` request.
#[derive(Debug, Deserialize)]
struct ResourcesReadParams {
    /// Resource URI.
    uri: String,
}

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state behind the axum application.
pub struct ServerState {
    /// Tool router serving `tools/call`.
    router: ToolRouter,
    /// Cache service backing resource reads and readiness.
    cache: Arc<CacheService>,
    /// Metrics sink for request counters and latencies.
    metrics: Arc<dyn GateMetrics>,
}

impl ServerState {
    /// Creates the shared server state.
    #[must_use]
    pub fn new(router: ToolRouter, cache: Arc<CacheService>, metrics: Arc<dyn GateMetrics>) -> Self {
        Self {
            router,
            cache,
            metrics,
        }
    }
}

/// Builds the axum application over the shared state.
#[must_use]
pub fn build_app(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(handle_health))
        .route("/ready", get(handle_ready))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Always-OK liveness endpoint.
pub async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness endpoint reporting the live snapshot shape.
pub async fn handle_ready(State(state): State<Arc<ServerState>>) -> Json<Value> {
    let snapshot = state.cache.current();
    Json(json!({
        "status": "ready",
        "entity_count": snapshot.entity_count(),
        "downstream_configured": state.cache.has_downstream(),
    }))
}

/// JSON-RPC endpoint dispatching every supported method.
pub async fn handle_mcp(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Json<JsonRpcResponse> {
    let started = Instant::now();
    let request = match serde_json::from_value::<JsonRpcRequest>(request) {
        Ok(request) => request,
        Err(err) => {
            let response =
                JsonRpcResponse::error(None, -32600, format!("invalid request: {err}"));
            record(&state, GateMethod::Invalid, None, &response, started);
            return Json(response);
        }
    };
    if request.jsonrpc != JSONRPC_VERSION {
        let response = JsonRpcResponse::error(
            request.id,
            -32600,
            "invalid request: jsonrpc must be \"2.0\"".to_string(),
        );
        record(&state, GateMethod::Invalid, None, &response, started);
        return Json(response);
    }

    let context = request_context(&headers);
    let (method, tool, response) = dispatch(&state, &context, request).await;
    record(&state, method, tool, &response, started);
    Json(response)
}

/// Routes one framed request to its method handler.
async fn dispatch(
    state: &ServerState,
    context: &RequestContext,
    request: JsonRpcRequest,
) -> (GateMethod, Option<ToolName>, JsonRpcResponse) {
    let id = request.id;
    match request.method.as_str() {
        "initialize" => (GateMethod::Initialize, None, handle_initialize(id)),
        "tools/list" => (
            GateMethod::ToolsList,
            None,
            JsonRpcResponse::result(id, json!({ "tools": state.router.list_tools() })),
        ),
        "tools/call" => {
            let (tool, response) = handle_tools_call(state, context, id, request.params).await;
            (GateMethod::ToolsCall, tool, response)
        }
        "resources/list" => (
            GateMethod::ResourcesList,
            None,
            JsonRpcResponse::result(id, json!({ "resources": resources::list_resources() })),
        ),
        "resources/read" => {
            (GateMethod::ResourcesRead, None, handle_resources_read(state, id, request.params))
        }
        other => (
            GateMethod::Other,
            None,
            JsonRpcResponse::error(id, -32601, format!("method not found: {other}")),
        ),
    }
}

/// Answers `initialize` with the protocol handshake.
fn handle_initialize(id: Option<Value>) -> JsonRpcResponse {
    JsonRpcResponse::result(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {
                "tools": {},
                "resources": {},
            },
        }),
    )
}

/// Answers `tools/call` by routing through both authorization layers.
async fn handle_tools_call(
    state: &ServerState,
    context: &RequestContext,
    id: Option<Value>,
    params: Option<Value>,
) -> (Option<ToolName>, JsonRpcResponse) {
    let params = match params
        .map(serde_json::from_value::<ToolsCallParams>)
        .transpose()
    {
        Ok(Some(params)) => params,
        Ok(None) => {
            return (
                None,
                JsonRpcResponse::error(id, -32602, "invalid parameters: missing".to_string()),
            );
        }
        Err(err) => {
            return (
                None,
                JsonRpcResponse::error(id, -32602, format!("invalid parameters: {err}")),
            );
        }
    };
    let Some(tool) = ToolName::parse(&params.name) else {
        let err = ToolError::UnknownTool(params.name);
        return (None, JsonRpcResponse::error(id, err.code(), err.to_string()));
    };
    match state.router.call(context, tool, params.arguments.as_ref()).await {
        Ok(text) => (
            Some(tool),
            JsonRpcResponse::result(
                id,
                json!({
                    "content": [{ "type": "text", "text": text }],
                    "isError": false,
                }),
            ),
        ),
        Err(err) => (Some(tool), JsonRpcResponse::error(id, err.code(), err.to_string())),
    }
}

/// Answers `resources/read` against the live snapshot.
fn handle_resources_read(
    state: &ServerState,
    id: Option<Value>,
    params: Option<Value>,
) -> JsonRpcResponse {
    let params = match params
        .map(serde_json::from_value::<ResourcesReadParams>)
        .transpose()
    {
        Ok(Some(params)) => params,
        Ok(None) => {
            return JsonRpcResponse::error(id, -32602, "invalid parameters: missing".to_string());
        }
        Err(err) => {
            return JsonRpcResponse::error(id, -32602, format!("invalid parameters: {err}"));
        }
    };
    let snapshot = state.cache.current();
    match resources::read(&params.uri, &snapshot, wall_clock_now()) {
        Some(text) => JsonRpcResponse::result(
            id,
            json!({
                "contents": [{
                    "uri": params.uri,
                    "mimeType": "text/plain",
                    "text": text,
                }],
            }),
        ),
        None => {
            JsonRpcResponse::error(id, -32002, format!("resource not found: {}", params.uri))
        }
    }
}

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Builds the routing context from request headers.
fn request_context(headers: &HeaderMap) -> RequestContext {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    RequestContext::new(authorization)
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Records counter and latency observations for one request.
fn record(
    state: &ServerState,
    method: GateMethod,
    tool: Option<ToolName>,
    response: &JsonRpcResponse,
    started: Instant,
) {
    let (outcome, error_code) = response
        .error
        .as_ref()
        .map_or((GateOutcome::Ok, None), |err| (GateOutcome::Error, Some(err.code)));
    let event = GateMetricEvent {
        method,
        tool,
        outcome,
        error_code,
    };
    state.metrics.record_request(event.clone());
    state.metrics.record_latency(event, started.elapsed());
}

// ============================================================================
// SECTION: Server Lifecycle
// ============================================================================

/// Failure modes of server startup and serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding the listener failed.
    #[error("bind {addr} failed: {source}")]
    Bind {
        /// Address that failed to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Serving failed after a successful bind.
    #[error("serve failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// HTTP server wrapper owning the bind address and shared state.
pub struct GateServer {
    /// Shared application state.
    state: Arc<ServerState>,
    /// Address to bind.
    bind_addr: SocketAddr,
}

impl GateServer {
    /// Creates a server over the given state and bind address.
    #[must_use]
    pub const fn new(state: Arc<ServerState>, bind_addr: SocketAddr) -> Self {
        Self {
            state,
            bind_addr,
        }
    }

    /// Binds and serves until the shutdown signal fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the bind or the accept loop fails.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
        let listener =
            tokio::net::TcpListener::bind(self.bind_addr).await.map_err(|source| {
                ServerError::Bind {
                    addr: self.bind_addr,
                    source,
                }
            })?;
        let app = build_app(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
