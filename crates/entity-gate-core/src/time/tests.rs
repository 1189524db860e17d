// crates/entity-gate-core/src/time/tests.rs
// ============================================================================
// Module: Timestamp Unit Tests
// Description: Unit tests for timestamp arithmetic.
// Purpose: Validate elapsed-seconds behavior including saturation.
// Dependencies: entity-gate-core
// ============================================================================

//! ## Overview
//! Exercises [`Timestamp`] elapsed-time arithmetic, including negative deltas.

use super::Timestamp;

#[test]
fn seconds_since_truncates_to_whole_seconds() {
    let earlier = Timestamp::from_unix_millis(10_000);
    let later = Timestamp::from_unix_millis(11_999);
    assert_eq!(later.seconds_since(earlier), 1);
}

#[test]
fn seconds_since_saturates_when_earlier_is_in_the_future() {
    let earlier = Timestamp::from_unix_millis(50_000);
    let later = Timestamp::from_unix_millis(10_000);
    assert_eq!(later.seconds_since(earlier), 0);
}

#[test]
fn seconds_since_same_instant_is_zero() {
    let at = Timestamp::from_unix_millis(42);
    assert_eq!(at.seconds_since(at), 0);
}

#[test]
fn unix_millis_round_trip() {
    let at = Timestamp::from_unix_millis(-1);
    assert_eq!(at.as_unix_millis(), -1);
}
