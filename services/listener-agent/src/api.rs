//! Remote load balancer API interface.
//!
//! The interface abstracts the listener calls the reconciler needs:
//! - Creating, deleting and starting listeners
//! - Describing one listener under one protocol
//! - Listing the ports configured on a load balancer
//!
//! [`crate::client::HttpSlbClient`] talks to the real endpoint and
//! [`crate::mock::MockSlbApi`] keeps everything in memory.

use async_trait::async_trait;
use slb_listener::{ListenerAttributes, ListenerRequest, Protocol};
use thiserror::Error;

/// Remote error codes meaning "no listener of that protocol on that port".
pub const NOT_FOUND_CODES: &[&str] = &[
    "UnsupportedProtocalPort",
    "InvalidParameter.ListenerNotFound",
    "ListenerNotFound",
];

/// Errors from the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    #[error("not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Create an API error from response details.
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    /// Returns true if the remote reported the object as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Listener operations on a cloud load balancer.
#[async_trait]
pub trait SlbApi: Send + Sync {
    /// Create a listener; returns the remote request id.
    async fn create_listener(&self, request: &ListenerRequest) -> Result<String, ApiError>;

    /// Delete the listener on `port`, whatever its protocol.
    async fn delete_listener(&self, load_balancer_id: &str, port: u16) -> Result<(), ApiError>;

    /// Start the listener on `port`.
    async fn start_listener(&self, load_balancer_id: &str, port: u16) -> Result<(), ApiError>;

    /// Describe the listener on `port` as `protocol`.
    ///
    /// Returns `None` when no listener of that protocol exists on the port.
    async fn describe_listener(
        &self,
        load_balancer_id: &str,
        port: u16,
        protocol: Protocol,
    ) -> Result<Option<ListenerAttributes>, ApiError>;

    /// Ports currently configured on the load balancer.
    async fn describe_listener_ports(&self, load_balancer_id: &str) -> Result<Vec<u16>, ApiError>;
}
