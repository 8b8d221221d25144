//! Core reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Validating and filtering the desired prefix list
//! - Computing insert and delete batches
//! - Sequencing batches against the single-use change-token lifecycle
//! - Classifying and propagating gateway failures
//!
//! ## Control Flow
//!
//! ```text
//! PrefixSource ──desired──▶ Reconciler::insert ──token + batch──▶ FirewallGateway
//!                           Reconciler (read current) ◀──────────┘
//!                           Reconciler::delete ──token + batch──▶ FirewallGateway
//! ```
//!
//! One run is fully sequential: insert → read → delete, with no overlap and
//! no internal retry. Any failure aborts the run; the firewall's single-use
//! token protocol makes concurrent runs against the same IP set unsafe, so
//! external serialization (a non-overlapping scheduler) is assumed.

pub mod plan;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::traits::FirewallGateway;

/// Events emitted by the Reconciler for operator-facing progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A reconciliation run started
    RunStarted {
        /// Number of desired prefixes for this run
        desired: usize,
    },

    /// The Insert batch was submitted
    InsertSubmitted {
        /// Entries in the submitted batch
        submitted: usize,
        /// Entries dropped by the mask-length window
        dropped: usize,
    },

    /// The current IP set contents were read back
    CurrentSetRead {
        /// Entries currently in the remote set
        entries: usize,
    },

    /// The Delete batch was submitted
    DeleteSubmitted {
        /// Entries in the submitted batch
        submitted: usize,
    },

    /// The delete phase had nothing to do and made no remote calls
    DeleteSkipped,

    /// The run completed successfully
    RunCompleted,

    /// The run aborted
    RunFailed {
        /// Terminal error, rendered
        error: String,
    },
}

/// Counts reported by a completed run, for the operator log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Entries submitted for insertion (after the mask-length filter)
    pub inserted: usize,
    /// Desired entries dropped by the mask-length window
    pub dropped: usize,
    /// Entries read back from the remote set
    pub current: usize,
    /// Entries submitted for deletion
    pub deleted: usize,
}

/// Core reconciliation engine
///
/// Owns the gateway boundary and the target IP set ID. The engine holds no
/// state between runs: each invocation reconciles from scratch against live
/// remote state, so runs are idempotent at the level of "desired state wins".
pub struct Reconciler {
    /// Firewall gateway for remote IP set operations
    gateway: Box<dyn FirewallGateway>,

    /// Target IP set identifier
    ip_set_id: String,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// progress events for the operator log.
    pub fn new(
        gateway: Box<dyn FirewallGateway>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let reconciler = Self {
            gateway,
            ip_set_id: config.ip_set_id.clone(),
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Run one full reconciliation: insert → read → delete.
    ///
    /// Any failure aborts the run immediately; the delete phase never runs
    /// after an insert failure, and no partial-completion report is produced.
    pub async fn run(&self, desired: &[String]) -> Result<RunSummary> {
        self.emit_event(SyncEvent::RunStarted {
            desired: desired.len(),
        });

        let summary = match self.run_phases(desired).await {
            Ok(summary) => summary,
            Err(e) => {
                self.emit_event(SyncEvent::RunFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        self.emit_event(SyncEvent::RunCompleted);
        Ok(summary)
    }

    async fn run_phases(&self, desired: &[String]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let (inserted, dropped) = self.insert_inner(desired).await?;
        summary.inserted = inserted;
        summary.dropped = dropped;

        let current = self.gateway.read_ip_set(&self.ip_set_id).await?;
        debug!(entries = current.len(), "read current IP set contents");
        summary.current = current.len();
        self.emit_event(SyncEvent::CurrentSetRead {
            entries: current.len(),
        });

        summary.deleted = self.delete_inner(desired, &current).await?;

        Ok(summary)
    }

    /// Insert phase: submit the desired prefixes as one Insert batch.
    ///
    /// An empty desired list fails immediately with [`Error::NoWork`] before
    /// any token is issued; inserting zero entries is a caller error, not a
    /// no-op. A batch emptied by the mask-length filter is still submitted,
    /// mirroring the firewall's tolerance for a no-op update. The same CIDR
    /// may be submitted even if already present; the gateway is assumed
    /// idempotent on duplicate inserts.
    pub async fn insert(&self, desired: &[String]) -> Result<()> {
        self.insert_inner(desired).await.map(|_| ())
    }

    async fn insert_inner(&self, desired: &[String]) -> Result<(usize, usize)> {
        if desired.is_empty() {
            return Err(Error::NoWork);
        }

        let batch = plan::insert_updates(desired)?;
        let dropped = desired.len() - batch.len();
        if dropped > 0 {
            info!(
                dropped,
                "dropped prefixes outside the supported mask-length window"
            );
        }

        // Token is issued immediately before submission and consumed by it.
        let token = self.gateway.issue_change_token().await?;
        self.gateway
            .apply_updates(&self.ip_set_id, &token, &batch)
            .await?;

        info!(submitted = batch.len(), "insert batch applied");
        self.emit_event(SyncEvent::InsertSubmitted {
            submitted: batch.len(),
            dropped,
        });

        Ok((batch.len(), dropped))
    }

    /// Delete phase: remove current entries that are no longer desired.
    ///
    /// Unlike the insert phase's empty-input rule, no candidates is a
    /// deliberate no-op: the phase returns success without issuing a token
    /// or calling the gateway.
    pub async fn delete(&self, desired: &[String], current: &[String]) -> Result<()> {
        self.delete_inner(desired, current).await.map(|_| ())
    }

    async fn delete_inner(&self, desired: &[String], current: &[String]) -> Result<usize> {
        let joined = plan::join_desired(desired);
        let batch = plan::delete_candidates(&joined, current);

        if batch.is_empty() {
            info!("no stale entries in the IP set, skipping delete");
            self.emit_event(SyncEvent::DeleteSkipped);
            return Ok(0);
        }

        let token = self.gateway.issue_change_token().await?;
        self.gateway
            .apply_updates(&self.ip_set_id, &token, &batch)
            .await?;

        info!(submitted = batch.len(), "delete batch applied");
        self.emit_event(SyncEvent::DeleteSubmitted {
            submitted: batch.len(),
        });

        Ok(batch.len())
    }

    /// Read the current contents of the target IP set
    pub async fn read_current(&self) -> Result<Vec<String>> {
        self.gateway.read_ip_set(&self.ip_set_id).await
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        // Bounded channel: if the consumer is behind, drop the event rather
        // than block the run.
        if self.event_tx.try_send(event).is_err() {
            warn!("sync event channel full, dropping event");
        }
    }
}
