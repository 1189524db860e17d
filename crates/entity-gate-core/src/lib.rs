// crates/entity-gate-core/src/lib.rs
// ============================================================================
// Module: Entity Gate Core
// Description: Domain types and backend-agnostic interfaces for Entity Gate.
// Purpose: Provide the cache, entitlement, and error model shared by all crates.
// Dependencies: async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! Entity Gate fronts a slow or unreliable upstream entity source with an
//! immutable, wholesale-replaced in-memory snapshot and gates every read
//! against the caller's resolved entitlements. This crate holds the pure
//! domain model: entity records, snapshots and their holder cell, user
//! profiles, and the interfaces implemented by outbound transports.
//!
//! The core never reads wall-clock time; hosts supply [`Timestamp`] values
//! so staleness checks stay deterministic and replayable in tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod entity;
pub mod interfaces;
pub mod profile;
pub mod snapshot;
pub mod time;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use entity::EntityRecord;
pub use interfaces::AuthError;
pub use interfaces::EntityFetcher;
pub use interfaces::FetchError;
pub use interfaces::IdentityVerifier;
pub use profile::UserProfile;
pub use snapshot::CacheSnapshot;
pub use snapshot::SnapshotHolder;
pub use time::Timestamp;
