// crates/entity-gate-core/src/profile/tests.rs
// ============================================================================
// Module: User Profile Unit Tests
// Description: Unit tests for role and category grant checks.
// Purpose: Validate the grant predicates used by both authorization layers.
// Dependencies: entity-gate-core
// ============================================================================

//! ## Overview
//! Exercises [`UserProfile`] role intersection and category membership.

use std::collections::BTreeSet;

use super::UserProfile;

/// Builds a profile with the given roles and categories.
fn profile(roles: &[&str], categories: &[&str]) -> UserProfile {
    UserProfile {
        subject_id: "subject-1".to_string(),
        roles: roles.iter().map(ToString::to_string).collect(),
        permitted_categories: categories.iter().map(ToString::to_string).collect(),
    }
}

#[test]
fn reader_role_satisfies_reader_or_admin_requirement() {
    let caller = profile(&["reader"], &[]);
    assert!(caller.has_any_role(["reader", "admin"]));
}

#[test]
fn empty_role_set_satisfies_nothing() {
    let caller = UserProfile {
        subject_id: "subject-2".to_string(),
        roles: BTreeSet::new(),
        permitted_categories: BTreeSet::new(),
    };
    assert!(!caller.has_any_role(["reader", "admin"]));
}

#[test]
fn disjoint_roles_do_not_satisfy_requirement() {
    let caller = profile(&["auditor"], &[]);
    assert!(!caller.has_any_role(["reader", "admin"]));
}

#[test]
fn category_membership_is_exact() {
    let caller = profile(&["reader"], &["ops"]);
    assert!(caller.permits_category("ops"));
    assert!(!caller.permits_category("finance"));
    assert!(!caller.permits_category("Ops"));
}
