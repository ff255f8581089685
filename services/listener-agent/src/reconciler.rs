//! Reconciliation loop for converging load balancer listeners.
//!
//! The reconciler:
//! - Re-reads the desired state file on every tick
//! - Reads the current listeners back from the load balancer
//! - Diffs the two by fingerprint and applies removals, then additions
//! - Returns the canonical listener set observed after the pass

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use slb_listener::{Listener, ListenerKey};
use slb_reconcile::{diff, DriftPolicy, DEFAULT_RECONCILE_INTERVAL};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::SlbApi;
use crate::apply::{Applier, ApplyError, PollConfig};
use crate::desired::DesiredState;
use crate::read::read_listeners;

/// Reconciliation loop configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Interval between passes.
    pub interval: Duration,

    /// What to do with listeners whose settings drifted.
    pub drift_policy: DriftPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RECONCILE_INTERVAL,
            drift_policy: DriftPolicy::default(),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<ListenerKey>,
    pub added: Vec<ListenerKey>,
    pub drifted: Vec<ListenerKey>,

    /// Canonical listeners read back after the pass.
    pub listeners: Vec<Listener>,
}

impl ReconcileReport {
    /// Returns true if the pass changed nothing.
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Reconciler for one agent.
pub struct Reconciler {
    api: Arc<dyn SlbApi>,
    poll: PollConfig,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(api: Arc<dyn SlbApi>, poll: PollConfig, config: ReconcilerConfig) -> Self {
        Self { api, poll, config }
    }

    /// Run the reconciliation loop until shutdown.
    pub async fn run(&self, desired_file: &Path, mut shutdown: watch::Receiver<bool>) {
        info!(
            reconcile_interval_secs = self.config.interval.as_secs(),
            desired_file = %desired_file.display(),
            "Starting reconciliation loop"
        );

        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let desired = match DesiredState::load(desired_file) {
                        Ok(desired) => desired,
                        Err(e) => {
                            warn!(error = %format!("{e:#}"), "Failed to load desired state, will retry");
                            continue;
                        }
                    };
                    if let Err(e) = self.reconcile_once(&desired).await {
                        error!(
                            load_balancer_id = %desired.load_balancer_id,
                            error = %e,
                            "Reconciliation failed"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Reconciler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Perform a single reconciliation pass.
    pub async fn reconcile_once(&self, desired: &DesiredState) -> Result<ReconcileReport, ApplyError> {
        let load_balancer_id = desired.load_balancer_id.as_str();
        debug!(load_balancer_id, "Starting reconciliation");

        let current = read_listeners(self.api.as_ref(), load_balancer_id).await?;
        let changes = diff(&desired.listeners, &current);

        for drift in &changes.drifted {
            warn!(
                load_balancer_id,
                listener = %drift.key(),
                fields = ?drift.changed_fields(),
                policy = ?self.config.drift_policy,
                "Listener settings drifted"
            );
        }
        let drifted = changes.drifted.iter().map(|d| d.key()).collect();

        let changes = changes.apply_drift_policy(self.config.drift_policy);
        if changes.is_converged() {
            debug!(load_balancer_id, "Listeners converged");
            return Ok(ReconcileReport {
                drifted,
                listeners: current,
                ..Default::default()
            });
        }

        info!(
            load_balancer_id,
            remove = changes.to_remove.len(),
            add = changes.to_add.len(),
            "Applying listener changes"
        );

        let applier = Applier::new(Arc::clone(&self.api), load_balancer_id, self.poll);
        applier.prepare(&changes.to_add)?;
        applier.remove(&changes.to_remove).await?;
        applier.add(&changes.to_add).await?;

        let listeners = read_listeners(self.api.as_ref(), load_balancer_id).await?;
        info!(
            load_balancer_id,
            listeners = listeners.len(),
            "Reconciliation complete"
        );

        Ok(ReconcileReport {
            removed: changes.to_remove.iter().map(Listener::key).collect(),
            added: changes.to_add.iter().map(Listener::key).collect(),
            drifted,
            listeners,
        })
    }
}
