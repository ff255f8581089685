//! Apply orchestrator.
//!
//! Removals are deletes keyed by load balancer port. Each addition walks
//! the listener lifecycle:
//!
//! ```text
//! Validating -> Building -> Creating -> AwaitingStopped -> Starting -> Active
//! ```
//!
//! A freshly created listener is provisioned asynchronously and must report
//! `stopped` before it can be started. The wait is bounded by
//! [`PollConfig::timeout`]. The first error ends the batch; listeners
//! already applied in the same batch stay applied.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use slb_listener::{build, validate, Listener, ListenerKey, ListenerStatus, ValidationError};
use slb_reconcile::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::api::{ApiError, SlbApi};

/// Status polling after a create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Remote operation an [`ApplyError::Remote`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
    Start,
    Describe,
    DescribePorts,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Start => "start",
            Operation::Describe => "describe",
            Operation::DescribePorts => "describe ports",
        })
    }
}

/// Errors that end a reconciliation pass.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{operation} {target} failed: {source}")]
    Remote {
        operation: Operation,
        target: String,
        #[source]
        source: ApiError,
    },

    #[error("listener {listener} did not become {expected} within {timeout:?} (last status: {})",
        .last_status.map_or_else(|| "absent".to_string(), |s| s.to_string()))]
    PollTimeout {
        listener: ListenerKey,
        expected: ListenerStatus,
        timeout: Duration,
        last_status: Option<ListenerStatus>,
    },
}

impl ApplyError {
    pub(crate) fn remote(operation: Operation, target: impl fmt::Display, source: ApiError) -> Self {
        Self::Remote {
            operation,
            target: target.to_string(),
            source,
        }
    }
}

/// Lifecycle of a listener being added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPhase {
    Validating,
    Building,
    Creating,
    AwaitingStopped,
    Starting,
    Active,
}

impl ListenerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerPhase::Validating => "validating",
            ListenerPhase::Building => "building",
            ListenerPhase::Creating => "creating",
            ListenerPhase::AwaitingStopped => "awaiting_stopped",
            ListenerPhase::Starting => "starting",
            ListenerPhase::Active => "active",
        }
    }
}

impl fmt::Display for ListenerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies removal and addition batches to one load balancer.
pub struct Applier {
    api: Arc<dyn SlbApi>,
    load_balancer_id: String,
    poll: PollConfig,
}

impl Applier {
    pub fn new(api: Arc<dyn SlbApi>, load_balancer_id: impl Into<String>, poll: PollConfig) -> Self {
        Self {
            api,
            load_balancer_id: load_balancer_id.into(),
            poll,
        }
    }

    /// Validate and build every listener in `listeners` without calling the API.
    pub fn prepare(&self, listeners: &[Listener]) -> Result<(), ApplyError> {
        for listener in listeners {
            validate(listener)?;
            build(&self.load_balancer_id, listener)?;
        }
        Ok(())
    }

    /// Delete every listener in `listeners`, in order, stopping at the first failure.
    pub async fn remove(&self, listeners: &[Listener]) -> Result<(), ApplyError> {
        for listener in listeners {
            let key = listener.key();
            info!(
                load_balancer_id = %self.load_balancer_id,
                listener = %key,
                "Deleting listener"
            );

            self.api
                .delete_listener(&self.load_balancer_id, listener.load_balancer_port)
                .await
                .map_err(|e| ApplyError::remote(Operation::Delete, key, e))?;
        }
        Ok(())
    }

    /// Create and start every listener in `listeners`, in order, stopping at
    /// the first failure.
    pub async fn add(&self, listeners: &[Listener]) -> Result<(), ApplyError> {
        for listener in listeners {
            self.add_listener(listener).await?;
        }
        Ok(())
    }

    /// Take one listener from validation to `running`.
    pub async fn add_listener(&self, listener: &Listener) -> Result<(), ApplyError> {
        let key = listener.key();
        let port = listener.load_balancer_port;

        self.enter(&key, ListenerPhase::Validating);
        validate(listener)?;

        self.enter(&key, ListenerPhase::Building);
        let request = build(&self.load_balancer_id, listener)?;

        self.enter(&key, ListenerPhase::Creating);
        let request_id = self
            .api
            .create_listener(&request)
            .await
            .map_err(|e| ApplyError::remote(Operation::Create, key, e))?;
        info!(
            load_balancer_id = %self.load_balancer_id,
            listener = %key,
            action = request.action(),
            request_id = %request_id,
            "Listener created"
        );

        self.enter(&key, ListenerPhase::AwaitingStopped);
        self.wait_for_status(listener, ListenerStatus::Stopped).await?;

        self.enter(&key, ListenerPhase::Starting);
        self.api
            .start_listener(&self.load_balancer_id, port)
            .await
            .map_err(|e| ApplyError::remote(Operation::Start, key, e))?;

        self.enter(&key, ListenerPhase::Active);
        info!(
            load_balancer_id = %self.load_balancer_id,
            listener = %key,
            "Listener started"
        );
        Ok(())
    }

    fn enter(&self, key: &ListenerKey, phase: ListenerPhase) {
        debug!(listener = %key, phase = %phase, "Listener phase");
    }

    /// Poll until the listener reports `expected` or the poll timeout passes.
    ///
    /// A describe that finds nothing counts as "not yet".
    async fn wait_for_status(
        &self,
        listener: &Listener,
        expected: ListenerStatus,
    ) -> Result<(), ApplyError> {
        let key = listener.key();
        let deadline = Instant::now() + self.poll.timeout;
        let mut last_status = None;

        loop {
            let attributes = self
                .api
                .describe_listener(&self.load_balancer_id, key.load_balancer_port, key.protocol)
                .await
                .map_err(|e| ApplyError::remote(Operation::Describe, key, e))?;

            match attributes.map(|a| a.status()) {
                Some(status) if status == expected => return Ok(()),
                Some(status) => {
                    debug!(listener = %key, status = %status, "Waiting for listener status");
                    last_status = Some(status);
                }
                None => debug!(listener = %key, "Listener not visible yet"),
            }

            if Instant::now() >= deadline {
                warn!(
                    listener = %key,
                    expected = %expected,
                    timeout_secs = self.poll.timeout.as_secs(),
                    "Timed out waiting for listener status"
                );
                return Err(ApplyError::PollTimeout {
                    listener: key,
                    expected,
                    timeout: self.poll.timeout,
                    last_status,
                });
            }

            sleep(self.poll.interval).await;
        }
    }
}
