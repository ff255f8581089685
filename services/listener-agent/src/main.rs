//! SLB Listener Agent
//!
//! Converges the listeners of a cloud load balancer to the set declared in
//! a desired state file, either once (`SLB_ONCE=1`) or on an interval until
//! interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slb_agent::config::Config;
use slb_agent::{
    DesiredState, HttpSlbClient, MockSlbApi, PollConfig, Reconciler, ReconcilerConfig, SlbApi,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        endpoint = %config.endpoint,
        desired_file = %config.desired_file.display(),
        mock = config.mock,
        once = config.once,
        "Starting SLB listener agent"
    );

    let api: Arc<dyn SlbApi> = if config.mock {
        Arc::new(MockSlbApi::new())
    } else {
        Arc::new(HttpSlbClient::new(&config).context("Failed to build API client")?)
    };

    let reconciler = Reconciler::new(
        api,
        PollConfig {
            interval: config.poll_interval,
            timeout: config.poll_timeout,
        },
        ReconcilerConfig {
            interval: config.reconcile_interval,
            drift_policy: config.drift_policy,
        },
    );

    if config.once {
        let desired = DesiredState::load(&config.desired_file)?;
        let report = reconciler
            .reconcile_once(&desired)
            .await
            .with_context(|| format!("Reconciliation of {} failed", desired.load_balancer_id))?;

        info!(
            removed = report.removed.len(),
            added = report.added.len(),
            drifted = report.drifted.len(),
            "Single pass complete"
        );
        println!("{}", serde_json::to_string_pretty(&report.listeners)?);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let desired_file = config.desired_file.clone();
    let mut reconciler_handle = tokio::spawn(async move {
        reconciler.run(&desired_file, shutdown_rx).await;
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            // A pass in flight finishes its poll before the loop sees shutdown.
            let _ = (&mut reconciler_handle).await;
        }
        _ = &mut reconciler_handle => {
            info!("Reconciler exited");
        }
    }

    info!("Listener agent shutdown complete");
    Ok(())
}
