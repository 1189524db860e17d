// crates/entity-gate-mcp/src/lib.rs
// ============================================================================
// Module: Entity Gate MCP Server
// Description: Tool routing, layered authorization, and cache serving over MCP.
// Purpose: Expose the entitlement-gated entity cache to MCP clients.
// Dependencies: entity-gate-core, entity-gate-config, axum, sha2, tokio
// ============================================================================

//! ## Overview
//! This crate assembles the Entity Gate server: the entitlement resolver and
//! layered authorization gate, the cache refresher service, the tool router
//! (`list_entities`, `get_entity`, `refresh_cache`), the read-only status
//! resources, and the HTTP JSON-RPC transport.
//!
//! Two authorization layers gate every read. Layer 3 checks the caller's
//! roles against the tool's required-role set at invocation time; Layer 4
//! filters returned data by the caller's permitted categories. Both are
//! required; neither is sufficient alone.
//!
//! Security posture: bearer credentials are untrusted input, appear only in
//! the verification request, and are cached strictly by one-way hash.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod cache;
pub mod resources;
pub mod server;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use audit::GateAuditEvent;
pub use audit::GateAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RefreshTrigger;
pub use auth::EntitlementResolver;
pub use auth::RequestContext;
pub use auth::ToolAuthz;
pub use cache::CacheService;
pub use server::GateServer;
pub use server::ServerError;
pub use server::ServerState;
pub use telemetry::GateMetrics;
pub use telemetry::NoopMetrics;
pub use tools::ToolError;
pub use tools::ToolName;
pub use tools::ToolRouter;
