// crates/entity-gate-mcp/src/cache.rs
// ============================================================================
// Module: Cache Refresher Service
// Description: Eager load, scheduled refresh, and forced refresh of snapshots.
// Purpose: Own the snapshot holder and apply the serve-stale-on-error policy.
// Dependencies: entity-gate-core, tokio
// ============================================================================

//! ## Overview
//! The cache service owns the single mutable reference to the current
//! snapshot. It performs the eager initial load (fail-fast when a downstream
//! is configured), runs the periodic background reload on a fixed period
//! equal to the snapshot ttl, and serves authorized on-demand refreshes.
//!
//! Failure handling differs by trigger. Scheduled cycles are isolated: a
//! failed tick is audited, the previous snapshot is retained, and the next
//! tick proceeds on schedule. Initial and manual refreshes surface the error
//! to the caller, because both explicitly asked for fresh data.
//!
//! ## Invariants
//! - Writers (scheduled tick, manual refresh) are mutually exclusive.
//! - Readers never block on an in-progress refresh.
//! - A half-built snapshot is never visible; replacement is wholesale.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use entity_gate_core::CacheSnapshot;
use entity_gate_core::EntityFetcher;
use entity_gate_core::FetchError;
use entity_gate_core::SnapshotHolder;
use entity_gate_core::Timestamp;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::audit::RefreshTrigger;

// ============================================================================
// SECTION: Wall Clock
// ============================================================================

/// Returns the current wall-clock time as a core timestamp.
#[must_use]
pub fn wall_clock_now() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0);
    Timestamp::from_unix_millis(millis)
}

// ============================================================================
// SECTION: Cache Service
// ============================================================================

/// Owns the current snapshot and all paths that replace it.
///
/// # Invariants
/// - `refresh_lock` serializes every snapshot replacement.
/// - `fetcher: None` selects degraded mode: the snapshot stays empty and
///   refresh attempts report the downstream as unconfigured.
pub struct CacheService {
    /// Holder of the live snapshot reference.
    holder: SnapshotHolder,
    /// Downstream fetcher; absent in degraded mode.
    fetcher: Option<Arc<dyn EntityFetcher>>,
    /// Snapshot time-to-live and background refresh period, in seconds.
    ttl_seconds: u64,
    /// Writer mutex serializing scheduled and manual refreshes.
    refresh_lock: Mutex<()>,
    /// Audit sink for refresh outcomes.
    audit: Arc<dyn GateAuditSink>,
}

impl CacheService {
    /// Performs the eager initial load and constructs the service.
    ///
    /// Without a configured fetcher the cache starts empty. With one, a
    /// failed initial fetch is fatal: the process must not start serving
    /// traffic against a broken upstream.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the configured downstream cannot produce
    /// the initial snapshot.
    pub async fn initialize(
        fetcher: Option<Arc<dyn EntityFetcher>>,
        ttl_seconds: u64,
        audit: Arc<dyn GateAuditSink>,
    ) -> Result<Self, FetchError> {
        let now = wall_clock_now();
        let initial = match &fetcher {
            None => CacheSnapshot::empty(now, ttl_seconds),
            Some(fetcher) => {
                let entities = fetcher.fetch_all().await.inspect_err(|err| {
                    audit.record(&GateAuditEvent::RefreshFailed {
                        trigger: RefreshTrigger::Initial,
                        error: err.to_string(),
                    });
                })?;
                let snapshot = CacheSnapshot::new(entities, wall_clock_now(), ttl_seconds);
                audit.record(&GateAuditEvent::RefreshSucceeded {
                    trigger: RefreshTrigger::Initial,
                    entity_count: snapshot.entity_count(),
                    refreshed_at: snapshot.last_refreshed_at(),
                });
                snapshot
            }
        };
        Ok(Self {
            holder: SnapshotHolder::new(initial),
            fetcher,
            ttl_seconds,
            refresh_lock: Mutex::new(()),
            audit,
        })
    }

    /// Returns the live snapshot without blocking on refreshes.
    #[must_use]
    pub fn current(&self) -> Arc<CacheSnapshot> {
        self.holder.current()
    }

    /// Returns true when a downstream fetcher is configured.
    #[must_use]
    pub const fn has_downstream(&self) -> bool {
        self.fetcher.is_some()
    }

    /// Returns the configured snapshot time-to-live in seconds.
    #[must_use]
    pub const fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Runs one authorized on-demand refresh cycle.
    ///
    /// Manual refresh is not stale-tolerant: the caller explicitly asked for
    /// fresh data, so failures propagate instead of being swallowed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotConfigured`] without a downstream and any
    /// other [`FetchError`] when the fetch fails; the previous snapshot is
    /// retained either way.
    pub async fn force_refresh(&self) -> Result<usize, FetchError> {
        self.refresh_once(RefreshTrigger::Manual).await
    }

    /// Runs one refresh cycle under the writer mutex.
    async fn refresh_once(&self, trigger: RefreshTrigger) -> Result<usize, FetchError> {
        let fetcher = self.fetcher.as_ref().ok_or(FetchError::NotConfigured)?;
        let _writer = self.refresh_lock.lock().await;
        match fetcher.fetch_all().await {
            Ok(entities) => {
                let snapshot =
                    CacheSnapshot::new(entities, wall_clock_now(), self.ttl_seconds);
                let entity_count = snapshot.entity_count();
                let refreshed_at = snapshot.last_refreshed_at();
                self.holder.replace(snapshot);
                self.audit.record(&GateAuditEvent::RefreshSucceeded {
                    trigger,
                    entity_count,
                    refreshed_at,
                });
                Ok(entity_count)
            }
            Err(err) => {
                self.audit.record(&GateAuditEvent::RefreshFailed {
                    trigger,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Spawns the long-lived background refresh task.
    ///
    /// Each tick sleeps for one ttl period and then attempts a refresh.
    /// Failures are isolated per cycle: the previous snapshot is retained and
    /// no retry happens before the next scheduled tick. The task exits
    /// promptly when the shutdown signal fires, interrupting the sleep.
    #[must_use]
    pub fn spawn_refresh_task(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if service.fetcher.is_none() {
                return;
            }
            loop {
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_secs(service.ttl_seconds)) => {
                        // Failure isolation per cycle; the outcome is audited
                        // inside refresh_once.
                        let _ = service.refresh_once(RefreshTrigger::Scheduled).await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
