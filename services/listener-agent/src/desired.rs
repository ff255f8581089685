//! Desired listener state, loaded from a JSON document.
//!
//! ```json
//! {
//!   "load_balancer_id": "lb-abc123",
//!   "listeners": [
//!     { "lb_port": 80, "instance_port": 8080, "lb_protocol": "http", "bandwidth": -1 }
//!   ]
//! }
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use slb_listener::{Flag, HealthCheckType, Listener, Protocol, Scheduler};
use slb_reconcile::check_listener_set;

/// The listeners one load balancer should have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub load_balancer_id: String,

    #[serde(default)]
    pub listeners: Vec<Listener>,
}

impl DesiredState {
    /// Parse a desired-state document, apply declaration defaults and check
    /// that the listener set is usable.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut state: DesiredState =
            serde_json::from_str(raw).context("invalid desired state JSON")?;

        if state.load_balancer_id.trim().is_empty() {
            anyhow::bail!("desired state has an empty load_balancer_id");
        }

        state.listeners = state
            .listeners
            .into_iter()
            .map(with_declaration_defaults)
            .collect();

        check_listener_set(&state.listeners).context("invalid listener set")?;

        Ok(state)
    }

    /// Read and parse a desired-state file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read desired state file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid desired state in {}", path.display()))
    }
}

/// Fill the defaults a declaration gets for fields its protocol defines.
///
/// Fields the protocol does not define are cleared, matching what a remote
/// read reports.
pub fn with_declaration_defaults(mut listener: Listener) -> Listener {
    match listener.protocol {
        Protocol::Tcp => {
            listener.scheduler.get_or_insert(Scheduler::default());
            listener.health_check_type.get_or_insert(HealthCheckType::Tcp);
        }
        Protocol::Udp => {}
        Protocol::Http | Protocol::Https => {
            listener.scheduler.get_or_insert(Scheduler::default());
            listener.sticky_session.get_or_insert(Flag::Off);
            listener.health_check.get_or_insert(Flag::Off);
        }
    }
    listener.projected()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_protocol() {
        let raw = r#"{
            "load_balancer_id": "lb-1",
            "listeners": [
                { "lb_port": 80, "instance_port": 8080, "lb_protocol": "http", "bandwidth": -1 },
                { "lb_port": 22, "instance_port": 22, "lb_protocol": "TCP", "bandwidth": 5 },
                { "lb_port": 53, "instance_port": 53, "lb_protocol": "udp", "bandwidth": -1 }
            ]
        }"#;

        let state = DesiredState::from_json(raw).unwrap();
        assert_eq!(state.load_balancer_id, "lb-1");

        let http = &state.listeners[0];
        assert_eq!(http.scheduler, Some(Scheduler::WeightedRoundRobin));
        assert_eq!(http.sticky_session, Some(Flag::Off));
        assert_eq!(http.health_check, Some(Flag::Off));
        assert_eq!(http.health_check_type, None);

        let tcp = &state.listeners[1];
        assert_eq!(tcp.protocol, Protocol::Tcp);
        assert_eq!(tcp.health_check_type, Some(HealthCheckType::Tcp));
        assert_eq!(tcp.sticky_session, None);

        let udp = &state.listeners[2];
        assert_eq!(udp, &Listener::new(53, 53, Protocol::Udp, -1));
    }

    #[test]
    fn test_declared_values_win_over_defaults() {
        let raw = r#"{
            "load_balancer_id": "lb-1",
            "listeners": [
                { "lb_port": 80, "instance_port": 8080, "lb_protocol": "http", "bandwidth": -1,
                  "scheduler": "rr", "sticky_session": "on", "sticky_session_type": "insert",
                  "cookie_timeout": 60 }
            ]
        }"#;

        let state = DesiredState::from_json(raw).unwrap();
        assert_eq!(state.listeners[0].scheduler, Some(Scheduler::RoundRobin));
        assert_eq!(state.listeners[0].sticky_session, Some(Flag::On));
    }

    #[test]
    fn test_fields_outside_protocol_are_dropped() {
        let raw = r#"{
            "load_balancer_id": "lb-1",
            "listeners": [
                { "lb_port": 80, "instance_port": 8080, "lb_protocol": "http", "bandwidth": -1,
                  "ssl_certificate_id": "cert-x", "persistence_timeout": 30 },
                { "lb_port": 443, "instance_port": 8443, "lb_protocol": "https", "bandwidth": -1,
                  "ssl_certificate_id": "cert-x" },
                { "lb_port": 53, "instance_port": 53, "lb_protocol": "udp", "bandwidth": -1,
                  "sticky_session": "on", "cookie": "c" }
            ]
        }"#;

        let state = DesiredState::from_json(raw).unwrap();
        assert!(state.listeners[0].ssl_certificate_id.is_empty());
        assert_eq!(state.listeners[0].persistence_timeout, 0);
        assert_eq!(state.listeners[1].ssl_certificate_id, "cert-x");
        assert_eq!(state.listeners[2].sticky_session, None);
        assert!(state.listeners[2].cookie.is_empty());
    }

    #[test]
    fn test_port_collision_is_rejected() {
        let raw = r#"{
            "load_balancer_id": "lb-1",
            "listeners": [
                { "lb_port": 80, "instance_port": 8080, "lb_protocol": "http", "bandwidth": -1 },
                { "lb_port": 80, "instance_port": 9090, "lb_protocol": "tcp", "bandwidth": -1 }
            ]
        }"#;

        let err = DesiredState::from_json(raw).unwrap_err();
        assert!(format!("{err:#}").contains("share load balancer port 80"));
    }

    #[test]
    fn test_empty_load_balancer_id_is_rejected() {
        assert!(DesiredState::from_json(r#"{ "load_balancer_id": " " }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desired.json");
        fs::write(&path, r#"{ "load_balancer_id": "lb-2", "listeners": [] }"#).unwrap();

        let state = DesiredState::load(&path).unwrap();
        assert_eq!(state.load_balancer_id, "lb-2");
        assert!(state.listeners.is_empty());

        assert!(DesiredState::load(&dir.path().join("missing.json")).is_err());
    }
}
