// crates/entity-gate-config/src/lib.rs
// ============================================================================
// Module: Entity Gate Configuration
// Description: Canonical configuration model, loading, and fail-closed validation.
// Purpose: Construct one validated config value at startup and pass it by reference.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is a single value object constructed once at startup and
//! passed by reference to constructors; nothing reads process environment or
//! ambient state after construction. Environment-style overrides are applied
//! through a pure overlay function over a supplied key/value map, so the
//! whole resolution path is testable in isolation.
//!
//! Validation is fail-closed: any out-of-range, malformed, or unrecognized
//! input is an error, never a silent default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted URL length.
const MAX_URL_LENGTH: usize = 2_048;
/// Maximum accepted role-name length.
const MAX_ROLE_LENGTH: usize = 64;
/// Maximum number of roles per tool rule.
const MAX_ROLES_PER_TOOL: usize = 16;
/// Inclusive lower bound for the cache ttl in seconds.
const MIN_TTL_SECONDS: u64 = 1;
/// Inclusive upper bound for the cache ttl in seconds (one day).
const MAX_TTL_SECONDS: u64 = 86_400;
/// Inclusive upper bound for outbound request timeouts in milliseconds.
const MAX_TIMEOUT_MS: u64 = 120_000;
/// Prefix shared by all recognized override keys.
pub const OVERRIDE_PREFIX: &str = "ENTITY_GATE_";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
///
/// # Invariants
/// - Messages identify the offending field but never echo secrets.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML input could not be parsed into the config model.
    #[error("config parse failed: {0}")]
    Parse(String),
    /// A field failed fail-closed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// An override key carried the recognized prefix but is not a known option.
    #[error("unrecognized override key: {0}")]
    UnknownOverride(String),
    /// An override value could not be applied to its option.
    #[error("invalid override {key}: {reason}")]
    InvalidOverride {
        /// Offending override key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

// ============================================================================
// SECTION: Section Models
// ============================================================================

/// Downstream entity-source settings.
///
/// # Invariants
/// - `base_url` is a non-empty http(s) URL without trailing whitespace.
/// - `timeout_ms` bounds the full request lifecycle of one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownstreamConfig {
    /// Base URL of the downstream entity API.
    pub base_url: String,
    /// Fetch timeout in milliseconds.
    #[serde(default = "default_downstream_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum accepted response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Identity-provider settings.
///
/// # Invariants
/// - `userinfo_url` is a non-empty http(s) URL.
/// - `timeout_ms` bounds one verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Userinfo endpoint queried with the caller's bearer credential.
    pub userinfo_url: String,
    /// Verification timeout in milliseconds.
    #[serde(default = "default_identity_timeout_ms")]
    pub timeout_ms: u64,
}

/// Entity cache settings.
///
/// # Invariants
/// - `ttl_seconds` is within `1..=86_400` after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Snapshot time-to-live in seconds; also the background refresh period.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

/// Server transport settings.
///
/// # Invariants
/// - `bind_addr` parses as a socket address after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the HTTP transport binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Per-tool required-role sets for call authorization.
///
/// # Invariants
/// - Every list is non-empty after validation; an empty list would make a
///   tool unreachable and is treated as a config mistake, not a lockout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Roles accepted for `list_entities`.
    #[serde(default = "default_reader_roles")]
    pub list_entities_roles: Vec<String>,
    /// Roles accepted for `get_entity`.
    #[serde(default = "default_reader_roles")]
    pub get_entity_roles: Vec<String>,
    /// Roles accepted for `refresh_cache`.
    #[serde(default = "default_admin_roles")]
    pub refresh_cache_roles: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            list_entities_roles: default_reader_roles(),
            get_entity_roles: default_reader_roles(),
            refresh_cache_roles: default_admin_roles(),
        }
    }
}

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// Canonical Entity Gate configuration.
///
/// # Invariants
/// - Constructed once at startup; passed by reference afterwards.
/// - `downstream: None` selects degraded mode: the cache starts empty and
///   the refresh tool reports the downstream as unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityGateConfig {
    /// Downstream entity-source settings; absent in degraded mode.
    #[serde(default)]
    pub downstream: Option<DownstreamConfig>,
    /// Identity-provider settings; absent disables credentialed access.
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
    /// Entity cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Server transport settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-tool required-role sets.
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl EntityGateConfig {
    /// Parses configuration from a TOML document.
    ///
    /// The result is unvalidated; callers apply overrides and then
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is not valid TOML for
    /// the config model.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies recognized overrides from a supplied key/value map.
    ///
    /// Pure with respect to process state: callers collect environment pairs
    /// themselves, which keeps resolution testable. Keys without the
    /// [`OVERRIDE_PREFIX`] are ignored; prefixed keys must be recognized.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOverride`] for unrecognized prefixed
    /// keys and [`ConfigError::InvalidOverride`] for unusable values.
    pub fn apply_overrides(
        &mut self,
        overrides: &BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (key, value) in overrides {
            if !key.starts_with(OVERRIDE_PREFIX) {
                continue;
            }
            match key.as_str() {
                "ENTITY_GATE_DOWNSTREAM_URL" => {
                    self.downstream = Some(DownstreamConfig {
                        base_url: value.clone(),
                        ..self.downstream.clone().unwrap_or_else(default_downstream)
                    });
                }
                "ENTITY_GATE_USERINFO_URL" => {
                    self.identity = Some(IdentityConfig {
                        userinfo_url: value.clone(),
                        ..self.identity.clone().unwrap_or_else(default_identity)
                    });
                }
                "ENTITY_GATE_CACHE_TTL_SECONDS" => {
                    self.cache.ttl_seconds =
                        value.parse::<u64>().map_err(|err| ConfigError::InvalidOverride {
                            key: key.clone(),
                            reason: err.to_string(),
                        })?;
                }
                "ENTITY_GATE_BIND_ADDR" => {
                    self.server.bind_addr = value.clone();
                }
                _ => return Err(ConfigError::UnknownOverride(key.clone())),
            }
        }
        Ok(())
    }

    /// Validates the configuration fail-closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(downstream) = &self.downstream {
            validate_url("downstream.base_url", &downstream.base_url)?;
            validate_timeout("downstream.timeout_ms", downstream.timeout_ms)?;
            if downstream.max_response_bytes == 0 {
                return Err(ConfigError::Invalid(
                    "downstream.max_response_bytes must be non-zero".to_string(),
                ));
            }
            if downstream.user_agent.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "downstream.user_agent must be non-empty".to_string(),
                ));
            }
        }
        if let Some(identity) = &self.identity {
            validate_url("identity.userinfo_url", &identity.userinfo_url)?;
            validate_timeout("identity.timeout_ms", identity.timeout_ms)?;
        }
        if !(MIN_TTL_SECONDS..=MAX_TTL_SECONDS).contains(&self.cache.ttl_seconds) {
            return Err(ConfigError::Invalid(format!(
                "cache.ttl_seconds must be within {MIN_TTL_SECONDS}..={MAX_TTL_SECONDS}"
            )));
        }
        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(
                "server.bind_addr must be a socket address".to_string(),
            ));
        }
        validate_roles("tools.list_entities_roles", &self.tools.list_entities_roles)?;
        validate_roles("tools.get_entity_roles", &self.tools.get_entity_roles)?;
        validate_roles("tools.refresh_cache_roles", &self.tools.refresh_cache_roles)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default downstream fetch timeout (30 seconds, matching the fetch client).
const fn default_downstream_timeout_ms() -> u64 {
    30_000
}

/// Default identity verification timeout (10 seconds).
const fn default_identity_timeout_ms() -> u64 {
    10_000
}

/// Default maximum downstream response size (4 MiB).
const fn default_max_response_bytes() -> usize {
    4 * 1024 * 1024
}

/// Default user agent for outbound requests.
fn default_user_agent() -> String {
    "entity-gate/0.1".to_string()
}

/// Default snapshot time-to-live (300 seconds).
const fn default_ttl_seconds() -> u64 {
    300
}

/// Default loopback bind address.
fn default_bind_addr() -> String {
    "127.0.0.1:8001".to_string()
}

/// Default role set for read tools.
fn default_reader_roles() -> Vec<String> {
    vec!["reader".to_string(), "admin".to_string()]
}

/// Default role set for admin tools.
fn default_admin_roles() -> Vec<String> {
    vec!["admin".to_string()]
}

/// Downstream section seeded with defaults for override-only construction.
fn default_downstream() -> DownstreamConfig {
    DownstreamConfig {
        base_url: String::new(),
        timeout_ms: default_downstream_timeout_ms(),
        max_response_bytes: default_max_response_bytes(),
        user_agent: default_user_agent(),
    }
}

/// Identity section seeded with defaults for override-only construction.
fn default_identity() -> IdentityConfig {
    IdentityConfig {
        userinfo_url: String::new(),
        timeout_ms: default_identity_timeout_ms(),
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates a URL field: non-empty, bounded, http(s), no embedded whitespace.
fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_URL_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} too long")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!("{field} must not contain whitespace")));
    }
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Err(ConfigError::Invalid(format!("{field} must use http or https")));
    }
    Ok(())
}

/// Validates an outbound timeout field.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!(
            "{field} must be within 1..={MAX_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

/// Validates a per-tool role list: non-empty list of well-formed role names.
fn validate_roles(field: &str, roles: &[String]) -> Result<(), ConfigError> {
    if roles.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must list at least one role")));
    }
    if roles.len() > MAX_ROLES_PER_TOOL {
        return Err(ConfigError::Invalid(format!("{field} lists too many roles")));
    }
    for role in roles {
        if role.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{field} role must be non-empty")));
        }
        if role.len() > MAX_ROLE_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} role too long")));
        }
        if !role.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(ConfigError::Invalid(format!(
                "{field} role must be alphanumeric with '-' or '_'"
            )));
        }
    }
    Ok(())
}
