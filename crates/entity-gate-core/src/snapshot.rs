// crates/entity-gate-core/src/snapshot.rs
// ============================================================================
// Module: Cache Snapshots
// Description: Immutable entity snapshots and the single-writer holder cell.
// Purpose: Provide atomic wholesale snapshot replacement with lock-light reads.
// Dependencies: crate::entity, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`CacheSnapshot`] is an immutable, timestamped, complete view of all
//! entities at one point in time. Refreshes never patch an existing snapshot;
//! they construct a new one and swap the reference held by a
//! [`SnapshotHolder`]. Because the snapshot is immutable, the swap alone is
//! sufficient for atomicity: readers observe fully-old or fully-new state,
//! never a mixture.
//!
//! Staleness (`now - last_refreshed_at > ttl`) is advisory. Stale snapshots
//! are still served, annotated by the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;

use crate::entity::EntityRecord;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Cache Snapshot
// ============================================================================

/// Immutable point-in-time view of all cached entities.
///
/// # Invariants
/// - No field is mutated after construction; replacement is wholesale.
/// - Entity keys equal the `id` of the stored record.
/// - Staleness is informational and never blocks reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Entities keyed by entity id.
    entities: BTreeMap<String, EntityRecord>,
    /// Time this snapshot was built.
    last_refreshed_at: Timestamp,
    /// Configured time-to-live in seconds.
    ttl_seconds: u64,
}

impl CacheSnapshot {
    /// Creates a snapshot from fetched entities.
    ///
    /// Entries are re-keyed by record id so the key invariant holds even for
    /// maps assembled by callers.
    #[must_use]
    pub fn new(
        entities: BTreeMap<String, EntityRecord>,
        refreshed_at: Timestamp,
        ttl_seconds: u64,
    ) -> Self {
        let entities = entities.into_values().map(|record| (record.id.clone(), record)).collect();
        Self {
            entities,
            last_refreshed_at: refreshed_at,
            ttl_seconds,
        }
    }

    /// Creates an empty snapshot for degraded mode (no downstream configured).
    #[must_use]
    pub const fn empty(refreshed_at: Timestamp, ttl_seconds: u64) -> Self {
        Self {
            entities: BTreeMap::new(),
            last_refreshed_at: refreshed_at,
            ttl_seconds,
        }
    }

    /// Returns the entity with the given id, if present.
    #[must_use]
    pub fn entity(&self, entity_id: &str) -> Option<&EntityRecord> {
        self.entities.get(entity_id)
    }

    /// Iterates over all entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entities.values()
    }

    /// Returns the number of cached entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the sorted set of categories present in the snapshot.
    #[must_use]
    pub fn categories(&self) -> BTreeSet<&str> {
        self.entities.values().map(|record| record.category.as_str()).collect()
    }

    /// Returns the time this snapshot was built.
    #[must_use]
    pub const fn last_refreshed_at(&self) -> Timestamp {
        self.last_refreshed_at
    }

    /// Returns the configured time-to-live in seconds.
    #[must_use]
    pub const fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Returns true when the snapshot's age exceeds its ttl at `now`.
    #[must_use]
    pub const fn is_stale(&self, now: Timestamp) -> bool {
        now.seconds_since(self.last_refreshed_at) > self.ttl_seconds
    }
}

// ============================================================================
// SECTION: Snapshot Holder
// ============================================================================

/// Single-writer/many-reader cell holding the current snapshot reference.
///
/// # Invariants
/// - `replace` performs a single indivisible reference swap.
/// - Readers obtain a complete snapshot; the write lock is held only for the
///   pointer assignment, never while a snapshot is being built.
/// - Writers must serialize externally when replacement ordering matters.
#[derive(Debug)]
pub struct SnapshotHolder {
    /// Current snapshot reference.
    current: RwLock<Arc<CacheSnapshot>>,
}

impl SnapshotHolder {
    /// Creates a holder seeded with the initial snapshot.
    #[must_use]
    pub fn new(initial: CacheSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Returns the live snapshot reference without blocking on refreshes.
    #[must_use]
    pub fn current(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the live snapshot reference with a fully built successor.
    pub fn replace(&self, next: CacheSnapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
