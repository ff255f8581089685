//! SLB Listener Agent Library
//!
//! The listener agent keeps the listeners of one cloud load balancer in
//! line with a declared set. Each pass reads the listeners back from the
//! load balancer, diffs them against the desired set by fingerprint, deletes
//! what is no longer declared and creates what is missing.
//!
//! ## Architecture
//!
//! ```text
//! Reconciler
//! ├── read_listeners   (describe + normalize)
//! ├── slb_reconcile    (fingerprint diff, drift)
//! └── Applier          (delete, create, poll for stopped, start)
//!         └── SlbApi   (HttpSlbClient in production, MockSlbApi in tests)
//! ```
//!
//! ## Modules
//!
//! - `api`: The remote API seam and its errors
//! - `apply`: Listener lifecycle orchestration
//! - `desired`: Desired state documents

pub mod api;
pub mod apply;
pub mod client;
pub mod config;
pub mod desired;
pub mod mock;
pub mod read;
pub mod reconciler;

// Re-export commonly used types
pub use api::{ApiError, SlbApi};
pub use apply::{Applier, ApplyError, ListenerPhase, Operation, PollConfig};
pub use client::HttpSlbClient;
pub use desired::DesiredState;
pub use mock::MockSlbApi;
pub use read::read_listeners;
pub use reconciler::{ReconcileReport, Reconciler, ReconcilerConfig};
