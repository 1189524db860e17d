// crates/entity-gate-providers/src/http.rs
// ============================================================================
// Module: HTTP Entity Fetcher
// Description: Downstream entity listing over HTTP with strict limits.
// Purpose: Provide the complete entity set for snapshot construction.
// Dependencies: entity-gate-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! The HTTP fetcher issues one bounded GET against `{base_url}/entities` and
//! decodes the response into a complete entity map. A fetch either yields the
//! whole set or an error; partial results are never returned, which keeps
//! snapshot construction atomic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use entity_gate_core::EntityFetcher;
use entity_gate_core::EntityRecord;
use entity_gate_core::FetchError;
use reqwest::Client;
use reqwest::Response;
use reqwest::redirect::Policy;
use url::Url;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP entity fetcher.
///
/// # Invariants
/// - `base_url` is operator-supplied and must be http(s).
/// - `timeout_ms` applies to the full request lifecycle.
/// - `max_response_bytes` is a hard upper bound on response bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFetcherConfig {
    /// Base URL of the downstream entity API.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 30_000,
            max_response_bytes: 4 * 1024 * 1024,
            user_agent: "entity-gate/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Fetcher Implementation
// ============================================================================

/// Entity fetcher backed by one HTTP endpoint.
///
/// # Invariants
/// - Redirects are not followed.
/// - Responses exceeding configured limits fail closed.
pub struct HttpEntityFetcher {
    /// Resolved listing endpoint (`{base_url}/entities`).
    endpoint: Url,
    /// Maximum response size allowed, in bytes.
    max_response_bytes: usize,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpEntityFetcher {
    /// Creates a fetcher for the configured downstream source.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the base URL is unusable or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &HttpFetcherConfig) -> Result<Self, FetchError> {
        let endpoint = entities_endpoint(&config.base_url)?;
        let client = build_client(config.timeout_ms, &config.user_agent)
            .map_err(|_| FetchError::Transport("http client build failed".to_string()))?;
        Ok(Self {
            endpoint,
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }
}

#[async_trait]
impl EntityFetcher for HttpEntityFetcher {
    async fn fetch_all(&self) -> Result<BTreeMap<String, EntityRecord>, FetchError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = read_body_limited(response, self.max_response_bytes).await?;
        let records = serde_json::from_slice::<Vec<EntityRecord>>(&body)
            .map_err(|err| FetchError::InvalidPayload(err.to_string()))?;
        Ok(records.into_iter().map(|record| (record.id.clone(), record)).collect())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves and validates the entity-listing endpoint.
fn entities_endpoint(base_url: &str) -> Result<Url, FetchError> {
    let base = Url::parse(base_url)
        .map_err(|_| FetchError::Transport("invalid downstream base url".to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(FetchError::Transport("unsupported downstream url scheme".to_string()));
    }
    if !base.username().is_empty() || base.password().is_some() {
        return Err(FetchError::Transport("url credentials are not allowed".to_string()));
    }
    let mut endpoint = base;
    {
        let mut segments = endpoint
            .path_segments_mut()
            .map_err(|()| FetchError::Transport("downstream url cannot be a base".to_string()))?;
        segments.pop_if_empty().push("entities");
    }
    Ok(endpoint)
}

/// Builds the outbound HTTP client shared by all fetch calls.
pub(crate) fn build_client(timeout_ms: u64, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(user_agent.to_string())
        .redirect(Policy::none())
        .build()
}

/// Reads the response body while enforcing a byte limit.
pub(crate) async fn read_body_limited(
    mut response: Response,
    max_bytes: usize,
) -> Result<Vec<u8>, FetchError> {
    let max_bytes_u64 = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(FetchError::InvalidPayload("response exceeds size limit".to_string()));
    }
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| FetchError::Transport(err.to_string()))?
    {
        if body.len().saturating_add(chunk.len()) > max_bytes {
            return Err(FetchError::InvalidPayload("response exceeds size limit".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
