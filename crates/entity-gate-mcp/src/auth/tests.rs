// crates/entity-gate-mcp/src/auth/tests.rs
// ============================================================================
// Module: Gate Authorization Unit Tests
// Description: Unit tests for bearer extraction, resolution, and role checks.
// Purpose: Validate fail-closed extraction and at-most-once verification.
// Dependencies: entity-gate-mcp, entity-gate-core
// ============================================================================

//! ## Overview
//! Exercises bearer-token extraction edge cases, entitlement-cache behavior
//! including negative-result handling, and Layer 3 role intersection.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use entity_gate_config::ToolsConfig;
use entity_gate_core::AuthError;
use entity_gate_core::IdentityVerifier;
use entity_gate_core::UserProfile;

use super::EntitlementResolver;
use super::RequestContext;
use super::ToolAuthz;
use super::token_hash_prefix;
use crate::audit::NoopAuditSink;
use crate::tools::ToolName;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Verifier that counts calls and fails until `fail_first` calls have passed.
struct CountingVerifier {
    /// Number of verification calls observed.
    calls: AtomicUsize,
    /// Number of leading calls that fail.
    fail_first: usize,
}

impl CountingVerifier {
    fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        }
    }

    fn failing_once() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: 1,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for CountingVerifier {
    async fn verify(&self, token: &str) -> Result<UserProfile, AuthError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(AuthError::Rejected("temporarily rejected".to_string()));
        }
        Ok(UserProfile {
            subject_id: format!("subject-{token}"),
            roles: BTreeSet::from(["reader".to_string()]),
            permitted_categories: BTreeSet::from(["ops".to_string()]),
        })
    }
}

/// Builds a resolver over the given verifier.
fn resolver(verifier: Arc<CountingVerifier>) -> EntitlementResolver {
    EntitlementResolver::new(verifier, Arc::new(NoopAuditSink))
}

/// Builds a profile with the given roles.
fn profile_with_roles(roles: &[&str]) -> UserProfile {
    UserProfile {
        subject_id: "subject-1".to_string(),
        roles: roles.iter().map(ToString::to_string).collect(),
        permitted_categories: BTreeSet::new(),
    }
}

// ============================================================================
// SECTION: Bearer Extraction
// ============================================================================

#[test]
fn missing_header_is_missing_credential() {
    let context = RequestContext::new(None);
    assert!(matches!(context.bearer_token(), Err(AuthError::MissingCredential)));
}

#[test]
fn non_bearer_scheme_is_malformed() {
    let context = RequestContext::new(Some("Basic dXNlcjpwYXNz".to_string()));
    assert!(matches!(context.bearer_token(), Err(AuthError::MalformedCredential)));
}

#[test]
fn bearer_without_token_is_malformed() {
    let context = RequestContext::new(Some("Bearer ".to_string()));
    assert!(matches!(context.bearer_token(), Err(AuthError::MalformedCredential)));
}

#[test]
fn bare_token_without_scheme_is_malformed() {
    let context = RequestContext::new(Some("token-abc".to_string()));
    assert!(matches!(context.bearer_token(), Err(AuthError::MalformedCredential)));
}

#[test]
fn bearer_scheme_is_case_insensitive() {
    let context = RequestContext::new(Some("bearer token-abc".to_string()));
    assert_eq!(context.bearer_token().expect("token"), "token-abc");
}

#[test]
fn surrounding_whitespace_is_trimmed_from_token() {
    let context = RequestContext::new(Some("Bearer   token-abc  ".to_string()));
    assert_eq!(context.bearer_token().expect("token"), "token-abc");
}

// ============================================================================
// SECTION: Entitlement Resolution
// ============================================================================

#[tokio::test]
async fn repeated_resolution_verifies_at_most_once() {
    let verifier = Arc::new(CountingVerifier::succeeding());
    let resolver = resolver(Arc::clone(&verifier));

    let first = resolver.resolve("token-abc").await.expect("first");
    let second = resolver.resolve("token-abc").await.expect("second");

    assert_eq!(first, second);
    assert_eq!(verifier.call_count(), 1);
    assert_eq!(resolver.cached_profile_count(), 1);
}

#[tokio::test]
async fn distinct_tokens_resolve_independently() {
    let verifier = Arc::new(CountingVerifier::succeeding());
    let resolver = resolver(Arc::clone(&verifier));

    let first = resolver.resolve("token-a").await.expect("a");
    let second = resolver.resolve("token-b").await.expect("b");

    assert_ne!(first.subject_id, second.subject_id);
    assert_eq!(verifier.call_count(), 2);
    assert_eq!(resolver.cached_profile_count(), 2);
}

#[tokio::test]
async fn verification_failure_is_not_cached() {
    let verifier = Arc::new(CountingVerifier::failing_once());
    let resolver = resolver(Arc::clone(&verifier));

    let denied = resolver.resolve("token-abc").await.expect_err("first must fail");
    assert!(matches!(denied, AuthError::Rejected(_)));
    assert_eq!(resolver.cached_profile_count(), 0);

    // The next attempt verifies again and succeeds.
    resolver.resolve("token-abc").await.expect("second");
    assert_eq!(verifier.call_count(), 2);
    assert_eq!(resolver.cached_profile_count(), 1);
}

#[tokio::test]
async fn concurrent_misses_for_one_token_converge_on_one_entry() {
    let verifier = Arc::new(CountingVerifier::succeeding());
    let resolver = Arc::new(resolver(Arc::clone(&verifier)));

    let tasks = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.resolve("token-abc").await })
        })
        .collect::<Vec<_>>();
    for task in tasks {
        task.await.expect("join").expect("resolve");
    }

    // Duplicate verification is tolerated; the cache still converges.
    assert!(verifier.call_count() >= 1);
    assert_eq!(resolver.cached_profile_count(), 1);
}

#[test]
fn hash_prefix_is_stable_and_short() {
    let prefix = token_hash_prefix("token-abc");
    assert_eq!(prefix.len(), 8);
    assert_eq!(prefix, token_hash_prefix("token-abc"));
    assert_ne!(prefix, token_hash_prefix("token-abd"));
}

// ============================================================================
// SECTION: Role Checks
// ============================================================================

#[test]
fn reader_passes_default_read_gate() {
    let authz = ToolAuthz::default();
    let caller = profile_with_roles(&["reader"]);
    assert!(authz.authorize(ToolName::ListEntities, &caller).is_ok());
}

#[test]
fn empty_role_set_is_denied_with_both_sets_named() {
    let authz = ToolAuthz::default();
    let caller = profile_with_roles(&[]);
    let denied = authz.authorize(ToolName::ListEntities, &caller).expect_err("denied");
    assert_eq!(denied.required, vec!["reader", "admin"]);
    assert!(denied.actual.is_empty());
}

#[test]
fn reader_cannot_refresh_the_cache() {
    let authz = ToolAuthz::default();
    let caller = profile_with_roles(&["reader"]);
    let denied = authz.authorize(ToolName::RefreshCache, &caller).expect_err("denied");
    assert_eq!(denied.required, vec!["admin"]);
    assert_eq!(denied.actual, vec!["reader"]);
}

#[test]
fn configured_role_overrides_are_honored() {
    let tools = ToolsConfig {
        refresh_cache_roles: vec!["admin".to_string(), "operator".to_string()],
        ..ToolsConfig::default()
    };
    let authz = ToolAuthz::from_config(&tools);
    let caller = profile_with_roles(&["operator"]);
    assert!(authz.authorize(ToolName::RefreshCache, &caller).is_ok());
}
