// crates/entity-gate-mcp/src/resources.rs
// ============================================================================
// Module: Gate Status Resources
// Description: Read-only cache summary and health resources.
// Purpose: Expose snapshot freshness without role checks.
// Dependencies: entity-gate-core, serde_json, time
// ============================================================================

//! ## Overview
//! Two read-only resources report on the cache: a summary (counts,
//! categories, freshness) and a minimal health line. Resource reads carry no
//! entity payloads and no caller-specific data, so they require no role
//! checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use entity_gate_core::CacheSnapshot;
use entity_gate_core::Timestamp;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// URI of the cache summary resource.
pub const SUMMARY_URI: &str = "cache://entities/summary";

/// URI of the cache health resource.
pub const HEALTH_URI: &str = "cache://entities/health";

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Returns the resource registry entries for `resources/list`.
#[must_use]
pub fn list_resources() -> Vec<Value> {
    vec![
        json!({
            "uri": SUMMARY_URI,
            "name": "Entity cache summary",
            "description": "Summary of the entity cache: counts, categories, freshness.",
            "mimeType": "text/plain",
        }),
        json!({
            "uri": HEALTH_URI,
            "name": "Entity cache health",
            "description": "Simple health check for the entity cache.",
            "mimeType": "text/plain",
        }),
    ]
}

/// Reads a resource by URI against the given snapshot.
///
/// Returns `None` for unregistered URIs.
#[must_use]
pub fn read(uri: &str, snapshot: &CacheSnapshot, now: Timestamp) -> Option<String> {
    match uri {
        SUMMARY_URI => Some(render_summary(snapshot, now)),
        HEALTH_URI => Some(render_health(snapshot, now)),
        _ => None,
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders the cache summary resource body.
#[must_use]
pub fn render_summary(snapshot: &CacheSnapshot, now: Timestamp) -> String {
    let categories = snapshot.categories();
    let categories = if categories.is_empty() {
        "(none)".to_string()
    } else {
        categories.into_iter().collect::<Vec<_>>().join(", ")
    };
    format!(
        "Total entities: {}\nCategories: {}\nLast refreshed: {}\nTTL: {}s\nStale: {}",
        snapshot.entity_count(),
        categories,
        format_timestamp(snapshot.last_refreshed_at()),
        snapshot.ttl_seconds(),
        snapshot.is_stale(now)
    )
}

/// Renders the cache health resource body.
#[must_use]
pub fn render_health(snapshot: &CacheSnapshot, now: Timestamp) -> String {
    let status = if snapshot.is_stale(now) { "stale" } else { "healthy" };
    format!(
        "status: {status}\nlast_refresh: {}",
        format_timestamp(snapshot.last_refreshed_at())
    )
}

/// Formats a timestamp as RFC 3339, falling back to raw millis.
fn format_timestamp(timestamp: Timestamp) -> String {
    let millis = timestamp.as_unix_millis();
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|instant| instant.format(&Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
