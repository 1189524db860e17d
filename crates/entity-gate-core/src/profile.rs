// crates/entity-gate-core/src/profile.rs
// ============================================================================
// Module: User Profiles
// Description: Resolved entitlements for a verified credential.
// Purpose: Carry the role and category grants consumed by the authorization gate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`UserProfile`] is produced once per distinct credential by the identity
//! verifier and cached for the process lifetime. It carries the two grant
//! sets the gate enforces: roles (Layer 3, call authorization) and permitted
//! categories (Layer 4, data filtering).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: User Profile
// ============================================================================

/// Resolved entitlements for one verified credential.
///
/// # Invariants
/// - Produced by the identity verifier; never synthesized from request data.
/// - Grants observed at first contact hold for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable subject identifier from the identity provider.
    pub subject_id: String,
    /// Roles granted to the subject.
    pub roles: BTreeSet<String>,
    /// Data categories the subject may read.
    pub permitted_categories: BTreeSet<String>,
}

impl UserProfile {
    /// Returns true when the profile holds at least one of the given roles.
    #[must_use]
    pub fn has_any_role<'a, I>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        required.into_iter().any(|role| self.roles.contains(role))
    }

    /// Returns true when the profile may read entities in `category`.
    #[must_use]
    pub fn permits_category(&self, category: &str) -> bool {
        self.permitted_categories.contains(category)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
