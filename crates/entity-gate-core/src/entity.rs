// crates/entity-gate-core/src/entity.rs
// ============================================================================
// Module: Entity Records
// Description: Immutable entity records fetched from the downstream source.
// Purpose: Provide the canonical data shape cached and served by Entity Gate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Entity records are the unit of data served by Entity Gate. They are
//! fetched wholesale from the downstream source and never mutated once
//! constructed; a refreshed record arrives only inside a new snapshot.
//!
//! Security posture: records originate from an external system and their
//! `category` drives data-level access filtering; treat all fields as
//! untrusted display data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Entity Record
// ============================================================================

/// A single entity as fetched from the downstream source.
///
/// # Invariants
/// - Identity is `id`; snapshots key entities by this value.
/// - Immutable once constructed; updates arrive only via snapshot replacement.
/// - `category` is the sole input to data-level (Layer 4) access filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Unique entity identifier.
    pub id: String,
    /// Human-readable entity name.
    pub name: String,
    /// Category used for entitlement filtering.
    pub category: String,
    /// Free-form string metadata attached by the downstream source.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}
