// crates/entity-gate-providers/src/identity.rs
// ============================================================================
// Module: HTTP Identity Verifier
// Description: Bearer-credential verification against a userinfo endpoint.
// Purpose: Exchange a credential for a resolved user profile.
// Dependencies: entity-gate-core, reqwest, serde, url
// ============================================================================

//! ## Overview
//! The identity verifier performs one GET against the configured userinfo
//! endpoint with the caller's bearer credential and maps the response into a
//! [`UserProfile`]. Any non-success status is a terminal authentication
//! denial; nothing is retried here and nothing negative is cached.
//!
//! Security posture: the credential travels only in the `Authorization`
//! header of this one request and never appears in errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use async_trait::async_trait;
use entity_gate_core::AuthError;
use entity_gate_core::IdentityVerifier;
use entity_gate_core::UserProfile;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use url::Url;

use crate::http::build_client;
use crate::http::read_body_limited;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Maximum accepted userinfo response size in bytes.
const MAX_USERINFO_BYTES: usize = 64 * 1024;

/// Configuration for the HTTP identity verifier.
///
/// # Invariants
/// - `userinfo_url` is operator-supplied and must be http(s).
/// - `timeout_ms` applies to the full verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpVerifierConfig {
    /// Userinfo endpoint queried with the caller's bearer credential.
    pub userinfo_url: String,
    /// Verification timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HttpVerifierConfig {
    fn default() -> Self {
        Self {
            userinfo_url: String::new(),
            timeout_ms: 10_000,
        }
    }
}

// ============================================================================
// SECTION: Wire Model
// ============================================================================

/// Userinfo payload as returned by the identity provider.
///
/// Unknown fields are ignored; absent grant fields resolve to empty sets so a
/// minimal provider response still verifies (with no access).
#[derive(Debug, Deserialize)]
struct UserInfoPayload {
    /// Stable subject identifier.
    sub: String,
    /// Roles granted to the subject.
    #[serde(default)]
    roles: Vec<String>,
    /// Entitlement lists keyed by entitlement kind.
    #[serde(default)]
    entitlements: BTreeMap<String, Vec<String>>,
}

/// Entitlement kind carrying permitted data categories.
const CATEGORY_ENTITLEMENT_KEY: &str = "categories";

// ============================================================================
// SECTION: Verifier Implementation
// ============================================================================

/// Identity verifier backed by one userinfo endpoint.
///
/// # Invariants
/// - Redirects are not followed.
/// - Non-success statuses map to [`AuthError::Rejected`].
pub struct HttpIdentityVerifier {
    /// Resolved userinfo endpoint.
    endpoint: Url,
    /// HTTP client used for verification calls.
    client: Client,
}

impl HttpIdentityVerifier {
    /// Creates a verifier for the configured identity provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the userinfo URL is unusable or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &HttpVerifierConfig) -> Result<Self, AuthError> {
        let endpoint = Url::parse(&config.userinfo_url)
            .map_err(|_| AuthError::Transport("invalid userinfo url".to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AuthError::Transport("unsupported userinfo url scheme".to_string()));
        }
        let client = build_client(config.timeout_ms, "entity-gate/0.1")
            .map_err(|_| AuthError::Transport("http client build failed".to_string()))?;
        Ok(Self {
            endpoint,
            client,
        })
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<UserProfile, AuthError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|err| AuthError::Transport(classify_transport_error(&err)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(format!("userinfo status {}", status.as_u16())));
        }
        let body = read_body_limited(response, MAX_USERINFO_BYTES)
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        let payload = serde_json::from_slice::<UserInfoPayload>(&body)
            .map_err(|_| AuthError::Rejected("userinfo payload invalid".to_string()))?;
        Ok(profile_from_payload(payload))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps the wire payload into the resolved profile.
fn profile_from_payload(payload: UserInfoPayload) -> UserProfile {
    let permitted_categories = payload
        .entitlements
        .get(CATEGORY_ENTITLEMENT_KEY)
        .map(|categories| categories.iter().cloned().collect::<BTreeSet<_>>())
        .unwrap_or_default();
    UserProfile {
        subject_id: payload.sub,
        roles: payload.roles.into_iter().collect(),
        permitted_categories,
    }
}

/// Produces a transport-error label without echoing headers or the credential.
fn classify_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "userinfo request timed out".to_string()
    } else if err.is_connect() {
        "userinfo endpoint unreachable".to_string()
    } else {
        "userinfo request failed".to_string()
    }
}
