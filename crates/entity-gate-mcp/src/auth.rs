// crates/entity-gate-mcp/src/auth.rs
// ============================================================================
// Module: Gate Authorization
// Description: Bearer extraction, entitlement resolution, and role checks.
// Purpose: Implement the call-authorization layer and the resolver cache.
// Dependencies: entity-gate-core, entity-gate-config, sha2
// ============================================================================

//! ## Overview
//! Every tool call re-enters the same per-request sequence: extract the
//! bearer credential from the request context, resolve entitlements, and
//! intersect the caller's roles with the tool's required-role set. No state
//! is retained across requests; the entitlement cache below is a
//! resolver-level optimization, not request state.
//!
//! The resolver caches profiles by a one-way SHA-256 hash of the credential
//! for the process lifetime. Concurrent misses for the same credential may
//! both verify and both insert; last-write-wins is tolerated because entries
//! for one credential are equivalent.
//!
//! Security posture: raw credentials never enter the cache, audit events, or
//! error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use entity_gate_config::ToolsConfig;
use entity_gate_core::AuthError;
use entity_gate_core::IdentityVerifier;
use entity_gate_core::UserProfile;
use sha2::Digest;
use sha2::Sha256;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::tools::ToolName;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context carrying the raw authorization header.
///
/// # Invariants
/// - Pure request container; credential validation happens at extraction.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Raw `Authorization` header value, when present.
    authorization: Option<String>,
}

impl RequestContext {
    /// Creates a context from the raw authorization header value.
    #[must_use]
    pub const fn new(authorization: Option<String>) -> Self {
        Self {
            authorization,
        }
    }

    /// Extracts the bearer token from the authorization header.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] when no header is present and
    /// [`AuthError::MalformedCredential`] when the header is not a non-empty
    /// `Bearer` credential.
    pub fn bearer_token(&self) -> Result<&str, AuthError> {
        let header = self.authorization.as_deref().ok_or(AuthError::MissingCredential)?;
        let (scheme, token) =
            header.split_once(' ').ok_or(AuthError::MalformedCredential)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::MalformedCredential);
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MalformedCredential);
        }
        Ok(token)
    }
}

// ============================================================================
// SECTION: Token Hashing
// ============================================================================

/// Length of the hash prefix used to identify credentials in audit events.
const TOKEN_HASH_PREFIX_LEN: usize = 8;

/// Returns the lowercase hex SHA-256 digest of the raw token.
fn token_hash(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Returns a short hash prefix safe for audit labeling.
#[must_use]
pub fn token_hash_prefix(token: &str) -> String {
    let mut hash = token_hash(token);
    hash.truncate(TOKEN_HASH_PREFIX_LEN);
    hash
}

// ============================================================================
// SECTION: Entitlement Resolver
// ============================================================================

/// Resolves bearer credentials to cached entitlement profiles.
///
/// # Invariants
/// - Cache keys are one-way hashes of the credential, never the credential.
/// - Entries never expire or get evicted within a process lifetime.
/// - Verification failures are propagated and never cached.
pub struct EntitlementResolver {
    /// Identity verifier consulted on cache misses.
    verifier: Arc<dyn IdentityVerifier>,
    /// Profiles keyed by credential hash.
    cache: RwLock<BTreeMap<String, UserProfile>>,
    /// Audit sink for resolution events.
    audit: Arc<dyn GateAuditSink>,
}

impl EntitlementResolver {
    /// Creates a resolver over the given verifier.
    #[must_use]
    pub fn new(verifier: Arc<dyn IdentityVerifier>, audit: Arc<dyn GateAuditSink>) -> Self {
        Self {
            verifier,
            cache: RwLock::new(BTreeMap::new()),
            audit,
        }
    }

    /// Resolves the credential to a profile, verifying on first contact.
    ///
    /// A cache hit returns without any network call. Lock guards are never
    /// held across the verification await.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the identity provider rejects the
    /// credential or cannot be reached.
    pub async fn resolve(&self, token: &str) -> Result<UserProfile, AuthError> {
        let hash = token_hash(token);
        if let Some(profile) =
            self.cache.read().unwrap_or_else(PoisonError::into_inner).get(&hash)
        {
            return Ok(profile.clone());
        }

        let profile = self.verifier.verify(token).await?;
        self.audit.record(&GateAuditEvent::EntitlementsResolved {
            subject_id: profile.subject_id.clone(),
            token_hash_prefix: token_hash_prefix(token),
        });
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hash, profile.clone());
        Ok(profile)
    }

    /// Returns the number of cached profiles.
    #[must_use]
    pub fn cached_profile_count(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

// ============================================================================
// SECTION: Reject-All Verifier
// ============================================================================

/// Verifier installed when no identity provider is configured.
///
/// # Invariants
/// - Every credential is rejected; the gate stays fail-closed in degraded
///   deployments rather than falling back to permissive access.
pub struct RejectAllVerifier;

#[async_trait]
impl IdentityVerifier for RejectAllVerifier {
    async fn verify(&self, _token: &str) -> Result<UserProfile, AuthError> {
        Err(AuthError::Rejected("no identity provider configured".to_string()))
    }
}

// ============================================================================
// SECTION: Call Authorization (Layer 3)
// ============================================================================

/// Denial detail for a failed role check.
///
/// # Invariants
/// - `required` and `actual` are disjoint when this value exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDenied {
    /// Roles the tool accepts.
    pub required: Vec<String>,
    /// Roles the caller holds.
    pub actual: Vec<String>,
}

/// Per-tool required-role sets enforced at invocation time.
///
/// # Invariants
/// - Every tool has a non-empty required-role list (enforced by config
///   validation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolAuthz {
    /// Roles accepted for `list_entities`.
    list_entities: Vec<String>,
    /// Roles accepted for `get_entity`.
    get_entity: Vec<String>,
    /// Roles accepted for `refresh_cache`.
    refresh_cache: Vec<String>,
}

impl ToolAuthz {
    /// Builds the authorizer from validated tool configuration.
    #[must_use]
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self {
            list_entities: tools.list_entities_roles.clone(),
            get_entity: tools.get_entity_roles.clone(),
            refresh_cache: tools.refresh_cache_roles.clone(),
        }
    }

    /// Returns the required-role list for the tool.
    #[must_use]
    pub fn required_roles(&self, tool: ToolName) -> &[String] {
        match tool {
            ToolName::ListEntities => &self.list_entities,
            ToolName::GetEntity => &self.get_entity,
            ToolName::RefreshCache => &self.refresh_cache,
        }
    }

    /// Checks the caller's roles against the tool's required set.
    ///
    /// # Errors
    ///
    /// Returns [`RoleDenied`] naming both role sets when the intersection is
    /// empty.
    pub fn authorize(&self, tool: ToolName, profile: &UserProfile) -> Result<(), RoleDenied> {
        let required = self.required_roles(tool);
        if profile.has_any_role(required.iter().map(String::as_str)) {
            Ok(())
        } else {
            Err(RoleDenied {
                required: required.to_vec(),
                actual: profile.roles.iter().cloned().collect(),
            })
        }
    }
}

impl Default for ToolAuthz {
    fn default() -> Self {
        Self::from_config(&ToolsConfig::default())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
