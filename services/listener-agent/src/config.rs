//! Configuration for the listener agent.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use slb_reconcile::{DriftPolicy, DEFAULT_POLL_TIMEOUT, DEFAULT_RECONCILE_INTERVAL};

/// Listener agent configuration (env-driven).
#[derive(Debug, Clone)]
pub struct Config {
    /// Load balancer API endpoint.
    pub endpoint: String,

    /// Bearer token sent with every API call.
    pub access_token: Option<String>,

    /// JSON file holding the desired listener set.
    pub desired_file: PathBuf,

    /// Interval between listener status polls after a create.
    pub poll_interval: Duration,

    /// How long a created listener may take to report `stopped`.
    pub poll_timeout: Duration,

    /// Interval between reconciliation passes.
    pub reconcile_interval: Duration,

    /// Whether settings drift forces delete and recreate.
    pub drift_policy: DriftPolicy,

    /// Run one pass and exit.
    pub once: bool,

    /// Use the in-memory API instead of the endpoint.
    pub mock: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint =
            lookup("SLB_ENDPOINT").unwrap_or_else(|| "https://slb.aliyuncs.com".to_string());

        let access_token = lookup("SLB_ACCESS_TOKEN").filter(|v| !v.is_empty());

        let desired_file = lookup("SLB_DESIRED_FILE")
            .map(PathBuf::from)
            .context("Missing desired state file. Set SLB_DESIRED_FILE.")?;

        let poll_interval_ms = lookup("SLB_POLL_INTERVAL_MS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("SLB_POLL_INTERVAL_MS must be an integer (milliseconds).")?
            .unwrap_or(1000);
        let poll_interval = Duration::from_millis(poll_interval_ms.max(50));

        let poll_timeout = lookup("SLB_POLL_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("SLB_POLL_TIMEOUT_SECS must be an integer (seconds).")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_TIMEOUT);

        let reconcile_interval = lookup("SLB_RECONCILE_INTERVAL_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("SLB_RECONCILE_INTERVAL_SECS must be an integer (seconds).")?
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or(DEFAULT_RECONCILE_INTERVAL);

        let flag = |name: &str| {
            lookup(name)
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(false)
        };

        let drift_policy = if flag("SLB_RECREATE_DRIFTED") {
            DriftPolicy::Recreate
        } else {
            DriftPolicy::Ignore
        };

        let log_level = lookup("SLB_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            endpoint,
            access_token,
            desired_file,
            poll_interval,
            poll_timeout,
            reconcile_interval,
            drift_policy,
            once: flag("SLB_ONCE"),
            mock: flag("SLB_MOCK"),
            log_level,
        })
    }
}
