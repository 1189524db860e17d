// crates/entity-gate-core/tests/proptest_staleness.rs
// ============================================================================
// Module: Staleness Property-Based Tests
// Description: Property tests for timestamp arithmetic and staleness checks.
// Purpose: Detect panics and boundary errors across wide time ranges.
// ============================================================================

//! Property-based tests for staleness invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use entity_gate_core::CacheSnapshot;
use entity_gate_core::Timestamp;
use proptest::prelude::*;

proptest! {
    #[test]
    fn seconds_since_never_panics_and_never_exceeds_delta(
        earlier in any::<i64>(),
        later in any::<i64>(),
    ) {
        let elapsed = Timestamp::from_unix_millis(later)
            .seconds_since(Timestamp::from_unix_millis(earlier));
        if later <= earlier {
            prop_assert_eq!(elapsed, 0);
        } else {
            let delta_millis = later.saturating_sub(earlier).unsigned_abs();
            prop_assert!(elapsed <= delta_millis);
        }
    }

    #[test]
    fn snapshot_is_never_stale_within_its_ttl(
        built_at in 0_i64 .. 1_000_000_000,
        ttl in 1_u64 ..= 86_400,
        offset_seconds in 0_u64 ..= 86_400,
    ) {
        let snapshot = CacheSnapshot::new(
            BTreeMap::new(),
            Timestamp::from_unix_millis(built_at),
            ttl,
        );
        let offset_millis = i64::try_from(offset_seconds * 1_000).expect("fits i64");
        let now = Timestamp::from_unix_millis(built_at.saturating_add(offset_millis));
        if offset_seconds <= ttl {
            prop_assert!(!snapshot.is_stale(now));
        } else {
            prop_assert!(snapshot.is_stale(now));
        }
    }
}
