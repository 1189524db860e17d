// crates/entity-gate-core/src/time.rs
// ============================================================================
// Module: Entity Gate Time Model
// Description: Canonical timestamp representation for snapshots and audit events.
// Purpose: Provide explicit, host-supplied time values across Entity Gate records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Entity Gate embeds explicit time values in snapshots and audit records to
//! keep staleness checks deterministic. The core never reads wall-clock time
//! directly; hosts supply timestamps at call boundaries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp used in Entity Gate snapshots and audit records.
///
/// # Invariants
/// - Values are unix epoch milliseconds, explicitly provided by callers.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the whole seconds elapsed from `earlier` to `self`.
    ///
    /// Saturates at zero when `earlier` is in the future relative to `self`.
    #[must_use]
    pub const fn seconds_since(self, earlier: Self) -> u64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta <= 0 {
            0
        } else {
            (delta as u64) / 1_000
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
