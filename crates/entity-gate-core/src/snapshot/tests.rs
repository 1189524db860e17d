// crates/entity-gate-core/src/snapshot/tests.rs
// ============================================================================
// Module: Snapshot Unit Tests
// Description: Unit tests for snapshot staleness and holder swap semantics.
// Purpose: Validate immutability, ttl boundaries, and atomic replacement.
// Dependencies: entity-gate-core
// ============================================================================

//! ## Overview
//! Exercises [`CacheSnapshot`] staleness math and [`SnapshotHolder`]
//! reference-swap behavior, including readers racing a writer.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use super::CacheSnapshot;
use super::SnapshotHolder;
use crate::entity::EntityRecord;
use crate::time::Timestamp;

/// Builds an entity record with empty metadata.
fn record(id: &str, category: &str) -> EntityRecord {
    EntityRecord {
        id: id.to_string(),
        name: format!("Entity {id}"),
        category: category.to_string(),
        metadata: BTreeMap::new(),
    }
}

/// Builds a snapshot holding the given records at the given time.
fn snapshot_with(records: &[EntityRecord], at: i64, ttl: u64) -> CacheSnapshot {
    let entities =
        records.iter().map(|r| (r.id.clone(), r.clone())).collect::<BTreeMap<_, _>>();
    CacheSnapshot::new(entities, Timestamp::from_unix_millis(at), ttl)
}

#[test]
fn fresh_snapshot_is_not_stale() {
    let snapshot = snapshot_with(&[], 1_000_000, 300);
    assert!(!snapshot.is_stale(Timestamp::from_unix_millis(1_000_000)));
}

#[test]
fn snapshot_at_exactly_ttl_is_not_stale() {
    let snapshot = snapshot_with(&[], 0, 300);
    assert!(!snapshot.is_stale(Timestamp::from_unix_millis(300_000)));
}

#[test]
fn snapshot_past_ttl_is_stale() {
    let snapshot = snapshot_with(&[], 0, 300);
    assert!(snapshot.is_stale(Timestamp::from_unix_millis(301_000)));
}

#[test]
fn snapshot_is_not_stale_when_clock_moves_backwards() {
    let snapshot = snapshot_with(&[], 500_000, 300);
    assert!(!snapshot.is_stale(Timestamp::from_unix_millis(0)));
}

#[test]
fn entities_are_rekeyed_by_record_id() {
    let mut entities = BTreeMap::new();
    entities.insert("wrong-key".to_string(), record("e1", "ops"));
    let snapshot = CacheSnapshot::new(entities, Timestamp::from_unix_millis(0), 300);
    assert!(snapshot.entity("wrong-key").is_none());
    assert_eq!(snapshot.entity("e1").expect("e1 present").category, "ops");
}

#[test]
fn categories_are_sorted_and_deduplicated() {
    let snapshot = snapshot_with(
        &[record("e1", "ops"), record("e2", "finance"), record("e3", "ops")],
        0,
        300,
    );
    let categories = snapshot.categories().into_iter().collect::<Vec<_>>();
    assert_eq!(categories, vec!["finance", "ops"]);
}

#[test]
fn replace_swaps_the_reference_wholesale() {
    let holder = SnapshotHolder::new(snapshot_with(&[record("e1", "ops")], 0, 300));
    let before = holder.current();
    holder.replace(snapshot_with(&[record("e2", "finance")], 10_000, 300));
    let after = holder.current();

    // Old reference still reads consistently after the swap.
    assert_eq!(before.entity_count(), 1);
    assert!(before.entity("e1").is_some());
    assert_eq!(after.entity_count(), 1);
    assert!(after.entity("e2").is_some());
    assert_eq!(after.last_refreshed_at(), Timestamp::from_unix_millis(10_000));
}

#[test]
fn readers_racing_a_writer_observe_whole_snapshots() {
    let holder = Arc::new(SnapshotHolder::new(snapshot_with(&[record("a", "ops")], 0, 300)));
    let writer_holder = Arc::clone(&holder);

    let writer = thread::spawn(move || {
        for tick in 1..200_i64 {
            writer_holder.replace(snapshot_with(
                &[record("a", "ops"), record("b", "ops")],
                tick * 1_000,
                300,
            ));
        }
    });

    let readers = (0..4)
        .map(|_| {
            let reader_holder = Arc::clone(&holder);
            thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = reader_holder.current();
                    // Every observed snapshot is one of the two complete states.
                    let count = snapshot.entity_count();
                    assert!(count == 1 || count == 2);
                    assert!(snapshot.entity("a").is_some());
                    if count == 2 {
                        assert!(snapshot.entity("b").is_some());
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    writer.join().expect("writer thread");
    for reader in readers {
        reader.join().expect("reader thread");
    }
}
