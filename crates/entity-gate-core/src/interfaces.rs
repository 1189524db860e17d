// crates/entity-gate-core/src/interfaces.rs
// ============================================================================
// Module: Entity Gate Interfaces
// Description: Backend-agnostic interfaces for entity fetching and identity.
// Purpose: Define the contract surfaces between the core and outbound transports.
// Dependencies: async-trait, thiserror, crate::entity, crate::profile
// ============================================================================

//! ## Overview
//! Interfaces define how Entity Gate integrates with the downstream entity
//! source and the identity provider without embedding transport details.
//! Implementations must fail closed: partial fetch results are never
//! returned, and verification failures always deny.
//!
//! Security posture: both interfaces consume untrusted remote data; raw
//! bearer credentials must never be persisted or logged by implementations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::EntityRecord;
use crate::profile::UserProfile;

// ============================================================================
// SECTION: Fetch Errors
// ============================================================================

/// Errors raised by the downstream entity source.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never contain credentials or response bodies.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure reaching the downstream source.
    #[error("downstream request failed: {0}")]
    Transport(String),
    /// Downstream responded with a non-success status.
    #[error("downstream returned status {0}")]
    Status(u16),
    /// Downstream payload could not be decoded into entity records.
    #[error("downstream payload invalid: {0}")]
    InvalidPayload(String),
    /// No downstream source is configured for this process.
    #[error("no downstream source is configured")]
    NotConfigured,
}

// ============================================================================
// SECTION: Authentication Errors
// ============================================================================

/// Errors raised while authenticating a bearer credential.
///
/// # Invariants
/// - Every variant is a terminal denial; callers never retry automatically.
/// - Messages never contain the raw credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer credential was present in the request context.
    #[error("no bearer credential in request")]
    MissingCredential,
    /// The authorization header was present but not a bearer credential.
    #[error("malformed authorization header")]
    MalformedCredential,
    /// The identity provider rejected the credential.
    #[error("credential rejected by identity provider: {0}")]
    Rejected(String),
    /// The identity provider could not be reached.
    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Entity Fetcher
// ============================================================================

/// Fetches the complete entity set from the downstream source.
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    /// Lists all entities, keyed by entity id.
    ///
    /// Fails atomically: either the complete set is returned or an error is.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the downstream source is unreachable,
    /// returns a non-success status, or yields an undecodable payload.
    async fn fetch_all(&self) -> Result<BTreeMap<String, EntityRecord>, FetchError>;
}

// ============================================================================
// SECTION: Identity Verifier
// ============================================================================

/// Exchanges a bearer credential for a resolved user profile.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies the credential and resolves its entitlements.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the credential is rejected or the identity
    /// provider cannot be reached.
    async fn verify(&self, token: &str) -> Result<UserProfile, AuthError>;
}
