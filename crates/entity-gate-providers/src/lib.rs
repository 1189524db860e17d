// crates/entity-gate-providers/src/lib.rs
// ============================================================================
// Module: Entity Gate Providers
// Description: Outbound HTTP implementations of the core interfaces.
// Purpose: Fetch entities and verify credentials against remote endpoints.
// Dependencies: entity-gate-core, reqwest, serde, url
// ============================================================================

//! ## Overview
//! This crate implements [`entity_gate_core::EntityFetcher`] and
//! [`entity_gate_core::IdentityVerifier`] over HTTP. Both clients carry fixed
//! request timeouts, disabled redirects, and response-size limits so that one
//! unresponsive upstream can never stall a refresh cycle or a request
//! indefinitely.
//!
//! Security posture: remote payloads are untrusted; responses are decoded
//! fail-closed and raw bearer credentials are never logged or stored.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;
pub mod identity;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use http::HttpEntityFetcher;
pub use http::HttpFetcherConfig;
pub use identity::HttpIdentityVerifier;
pub use identity::HttpVerifierConfig;
