// crates/entity-gate-mcp/src/tools.rs
// ============================================================================
// Module: Gate Tool Router
// Description: Tool registry, parameter decoding, and layered call routing.
// Purpose: Route authorized tool calls against the live cache snapshot.
// Dependencies: entity-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The router owns the full per-call sequence for the three tools:
//! credential extraction, entitlement resolution, the invocation-time role
//! check, and finally the tool body with data-level category filtering.
//!
//! The two authorization layers compose but never substitute for each other.
//! A caller holding a reading role still sees only entities whose category
//! is in their permitted set; list results silently omit the rest, while a
//! direct fetch of an unpermitted entity returns an explicit denial text so
//! the caller learns the entity exists but is out of reach.
//!
//! Stale snapshots are served with a warning suffix, never rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::sync::Arc;

use entity_gate_core::AuthError;
use entity_gate_core::CacheSnapshot;
use entity_gate_core::EntityRecord;
use entity_gate_core::FetchError;
use entity_gate_core::Timestamp;
use entity_gate_core::UserProfile;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::auth::EntitlementResolver;
use crate::auth::RequestContext;
use crate::auth::ToolAuthz;
use crate::cache::CacheService;
use crate::cache::wall_clock_now;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix appended to tool output when the served snapshot is stale.
const STALE_WARNING: &str = "\n\n[Warning: cached data may be stale]";

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Stable identifiers for the served tools.
///
/// # Invariants
/// - Wire names are stable; renames are breaking changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Entitlement-filtered entity listing.
    ListEntities,
    /// Single-entity lookup by identifier.
    GetEntity,
    /// Authorized on-demand cache refresh.
    RefreshCache,
}

impl ToolName {
    /// All served tools in registry order.
    pub const ALL: &'static [Self] = &[Self::ListEntities, Self::GetEntity, Self::RefreshCache];

    /// Returns the stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListEntities => "list_entities",
            Self::GetEntity => "get_entity",
            Self::RefreshCache => "refresh_cache",
        }
    }

    /// Parses a wire name into a tool identifier.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tool| tool.as_str() == name)
    }

    /// Returns the human-readable tool description for listings.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ListEntities => {
                "List cached entities, filtered by the caller's entitlements \
                 and an optional category."
            }
            Self::GetEntity => "Retrieve a single entity by ID, subject to entitlement checks.",
            Self::RefreshCache => "Force a cache refresh (admin only).",
        }
    }

    /// Returns the JSON schema describing the tool's parameters.
    #[must_use]
    pub fn input_schema(self) -> Value {
        match self {
            Self::ListEntities => json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "Optional category filter."
                    }
                },
                "additionalProperties": false
            }),
            Self::GetEntity => json!({
                "type": "object",
                "properties": {
                    "entity_id": {
                        "type": "string",
                        "description": "Identifier of the entity to fetch."
                    }
                },
                "required": ["entity_id"],
                "additionalProperties": false
            }),
            Self::RefreshCache => json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

// ============================================================================
// SECTION: Tool Errors
// ============================================================================

/// Failure modes of a tool call that surface as JSON-RPC errors.
///
/// # Invariants
/// - Layer 4 category denials are normal text outcomes, never this error.
/// - Messages never contain raw credentials.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Credential extraction or verification failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    /// The verified caller holds none of the tool's required roles.
    #[error("access denied: requires one of {required:?}, caller has {actual:?}")]
    Forbidden {
        /// Roles the tool accepts.
        required: Vec<String>,
        /// Roles the caller holds.
        actual: Vec<String>,
    },
    /// The requested tool name is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Tool parameters failed to decode.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// An authorized manual refresh failed against the downstream.
    #[error("refresh failed: {0}")]
    Fetch(#[from] FetchError),
}

impl ToolError {
    /// Returns the stable JSON-RPC error code for this failure.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Auth(_) => -32001,
            Self::Forbidden {
                ..
            } => -32003,
            Self::UnknownTool(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Fetch(_) => -32010,
        }
    }
}

// ============================================================================
// SECTION: Parameter Shapes
// ============================================================================

/// Parameters accepted by `list_entities`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListEntitiesParams {
    /// Optional category filter.
    #[serde(default)]
    category: Option<String>,
}

/// Parameters accepted by `get_entity`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetEntityParams {
    /// Identifier of the entity to fetch.
    entity_id: String,
}

/// Decodes tool parameters, treating an absent object as empty.
fn decode_params<T>(params: Option<&Value>) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    let value = params.cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Routes authorized tool calls against the live snapshot.
///
/// # Invariants
/// - Every call re-enters the extract/resolve/authorize sequence; no
///   request-scoped state survives between calls.
pub struct ToolRouter {
    /// Cache service owning the live snapshot.
    cache: Arc<CacheService>,
    /// Entitlement resolver consulted per call.
    resolver: Arc<EntitlementResolver>,
    /// Per-tool required-role sets.
    authz: ToolAuthz,
    /// Audit sink for denials.
    audit: Arc<dyn GateAuditSink>,
}

impl ToolRouter {
    /// Creates a router over the given cache, resolver, and role policy.
    #[must_use]
    pub fn new(
        cache: Arc<CacheService>,
        resolver: Arc<EntitlementResolver>,
        authz: ToolAuthz,
        audit: Arc<dyn GateAuditSink>,
    ) -> Self {
        Self {
            cache,
            resolver,
            authz,
            audit,
        }
    }

    /// Returns the tool registry entries for `tools/list`.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Value> {
        ToolName::ALL
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.as_str(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }

    /// Runs one tool call through both authorization layers.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for credential failures, role denials, parameter
    /// decoding failures, and manual-refresh fetch failures. Category-level
    /// denials and lookup misses are successful text outcomes.
    pub async fn call(
        &self,
        context: &RequestContext,
        tool: ToolName,
        params: Option<&Value>,
    ) -> Result<String, ToolError> {
        let profile = self.authorize(context, tool).await?;
        match tool {
            ToolName::ListEntities => {
                let params: ListEntitiesParams = decode_params(params)?;
                Ok(self.list_entities(&profile, params.category.as_deref()))
            }
            ToolName::GetEntity => {
                let params: GetEntityParams = decode_params(params)?;
                Ok(self.get_entity(&profile, &params.entity_id))
            }
            ToolName::RefreshCache => self.refresh_cache().await,
        }
    }

    /// Runs credential extraction, resolution, and the role check.
    async fn authorize(
        &self,
        context: &RequestContext,
        tool: ToolName,
    ) -> Result<UserProfile, ToolError> {
        let token = context.bearer_token().inspect_err(|err| {
            self.audit.record(&GateAuditEvent::AuthDenied {
                reason: err.to_string(),
            });
        })?;
        let profile = self.resolver.resolve(token).await.inspect_err(|err| {
            self.audit.record(&GateAuditEvent::AuthDenied {
                reason: err.to_string(),
            });
        })?;
        if let Err(denied) = self.authz.authorize(tool, &profile) {
            self.audit.record(&GateAuditEvent::ToolDenied {
                tool,
                subject_id: profile.subject_id.clone(),
                required_roles: denied.required.clone(),
                actual_roles: denied.actual.clone(),
            });
            return Err(ToolError::Forbidden {
                required: denied.required,
                actual: denied.actual,
            });
        }
        Ok(profile)
    }

    /// Renders the entitlement-filtered entity listing.
    fn list_entities(&self, profile: &UserProfile, category: Option<&str>) -> String {
        let snapshot = self.cache.current();
        let visible = snapshot
            .entities()
            .filter(|entity| profile.permits_category(&entity.category))
            .filter(|entity| category.is_none_or(|wanted| entity.category == wanted))
            .collect::<Vec<_>>();

        if visible.is_empty() {
            return "No entities found matching your entitlements and filter.".to_string();
        }

        let mut result = String::new();
        for (index, entity) in visible.iter().enumerate() {
            if index > 0 {
                result.push('\n');
            }
            let _ = write!(
                result,
                "- {} (id={}, category={})",
                entity.name, entity.id, entity.category
            );
        }
        annotate_stale(result, &snapshot, wall_clock_now())
    }

    /// Renders a single entity or the applicable miss/denial text.
    fn get_entity(&self, profile: &UserProfile, entity_id: &str) -> String {
        let snapshot = self.cache.current();
        let Some(entity) = snapshot.entity(entity_id) else {
            return format!("Entity '{entity_id}' not found.");
        };
        if !profile.permits_category(&entity.category) {
            return format!(
                "Access denied: you do not have entitlements for category '{}'.",
                entity.category
            );
        }
        let rendered = format!(
            "Name: {}\nID: {}\nCategory: {}\nMetadata: {}",
            entity.name,
            entity.id,
            entity.category,
            render_metadata(entity)
        );
        annotate_stale(rendered, &snapshot, wall_clock_now())
    }

    /// Runs the authorized on-demand refresh.
    async fn refresh_cache(&self) -> Result<String, ToolError> {
        if !self.cache.has_downstream() {
            return Ok("No downstream API configured; cache refresh unavailable.".to_string());
        }
        let entity_count = self.cache.force_refresh().await?;
        Ok(format!("Cache refreshed. {entity_count} entities loaded."))
    }
}

/// Appends the stale warning when the snapshot has outlived its ttl.
fn annotate_stale(mut text: String, snapshot: &CacheSnapshot, now: Timestamp) -> String {
    if snapshot.is_stale(now) {
        text.push_str(STALE_WARNING);
    }
    text
}

/// Renders entity metadata as sorted `key=value` pairs.
fn render_metadata(entity: &EntityRecord) -> String {
    if entity.metadata.is_empty() {
        return "(none)".to_string();
    }
    entity
        .metadata
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
