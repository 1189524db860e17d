// crates/entity-gate-mcp/src/audit.rs
// ============================================================================
// Module: Gate Audit
// Description: Structured audit events for authorization and refresh outcomes.
// Purpose: Provide a pluggable sink seam for operational logging.
// Dependencies: entity-gate-core, serde
// ============================================================================

//! ## Overview
//! Audit events are the operational log of Entity Gate: authentication and
//! authorization denials, refresh successes and failures, and snapshot swaps.
//! Sinks are pluggable so deployments can route events to stderr, files, or
//! collectors without redesign.
//!
//! ## Invariants
//! - Events never contain raw credentials; credentials are identified only by
//!   a short one-way hash prefix.
//! - Recording an event must not fail the operation being audited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use entity_gate_core::Timestamp;
use serde::Serialize;

use crate::tools::ToolName;

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// What initiated a refresh attempt.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    /// Eager load at process start.
    Initial,
    /// Scheduled background cycle.
    Scheduled,
    /// Authorized manual refresh call.
    Manual,
}

/// Structured audit event emitted by the gate.
///
/// # Invariants
/// - `token_hash_prefix` values are one-way hash prefixes, never raw tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GateAuditEvent {
    /// A credential failed extraction or verification.
    AuthDenied {
        /// Stable denial reason label.
        reason: String,
    },
    /// A verified caller lacked every required role for a tool.
    ToolDenied {
        /// Tool that was invoked.
        tool: ToolName,
        /// Subject identifier of the caller.
        subject_id: String,
        /// Roles the tool accepts.
        required_roles: Vec<String>,
        /// Roles the caller holds.
        actual_roles: Vec<String>,
    },
    /// A credential was verified and its profile cached.
    EntitlementsResolved {
        /// Subject identifier of the caller.
        subject_id: String,
        /// Hash prefix identifying the credential.
        token_hash_prefix: String,
    },
    /// A refresh cycle produced and installed a new snapshot.
    RefreshSucceeded {
        /// What initiated the refresh.
        trigger: RefreshTrigger,
        /// Entity count in the new snapshot.
        entity_count: usize,
        /// Build time of the new snapshot.
        refreshed_at: Timestamp,
    },
    /// A refresh cycle failed; the previous snapshot was retained.
    RefreshFailed {
        /// What initiated the refresh.
        trigger: RefreshTrigger,
        /// Stable error description.
        error: String,
    },
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Audit sink for gate events.
pub trait GateAuditSink: Send + Sync {
    /// Records one audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// No-op audit sink.
///
/// # Invariants
/// - Events are intentionally discarded.
pub struct NoopAuditSink;

impl GateAuditSink for NoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}
