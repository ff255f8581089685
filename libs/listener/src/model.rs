//! Canonical, protocol-agnostic listener representation.
//!
//! Every listener, whether declared by the user or read back from the
//! remote API, is expressed as a [`Listener`]. Fields a protocol does not
//! define stay at their zero value: empty strings, zero numbers, `None`
//! enums and empty code lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ListenerParseError;

wire_enum! {
    /// Listener protocol. Parsing is case-insensitive.
    Protocol, "protocol" {
        Tcp => "tcp",
        Udp => "udp",
        Http => "http",
        Https => "https",
    }
}

impl Protocol {
    /// Returns true for the protocols that carry affinity and the on/off health check switch.
    pub fn is_http_family(&self) -> bool {
        matches!(self, Protocol::Http | Protocol::Https)
    }
}

wire_enum! {
    /// On/off switch used by sticky session and health check.
    Flag, "flag" {
        On => "on",
        Off => "off",
    }
}

wire_enum! {
    /// Backend selection algorithm.
    Scheduler, "scheduler" {
        RoundRobin => "rr" | "round-robin",
        WeightedRoundRobin => "wrr" | "weighted-round-robin",
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::WeightedRoundRobin
    }
}

wire_enum! {
    /// How session affinity is tracked.
    StickySessionType, "sticky_session_type" {
        /// The load balancer injects its own cookie.
        Insert => "insert",
        /// The backend's cookie is reused.
        Server => "server",
    }
}

wire_enum! {
    /// Probe type for TCP listener health checks.
    HealthCheckType, "health_check_type" {
        Tcp => "tcp",
        Http => "http",
    }
}

wire_enum! {
    /// HTTP status class accepted as healthy.
    HttpCode, "health_check_http_code" {
        Http2xx => "http_2xx",
        Http3xx => "http_3xx",
        Http4xx => "http_4xx",
        Http5xx => "http_5xx",
    }
}

/// Set of accepted health check status classes.
///
/// Travels as a comma-separated string (`"http_2xx,http_3xx"`); order is
/// preserved so a value read back compares equal to what was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HttpCodes(Vec<HttpCode>);

impl HttpCodes {
    pub fn new(codes: impl IntoIterator<Item = HttpCode>) -> Self {
        let mut out = Vec::new();
        for code in codes {
            if !out.contains(&code) {
                out.push(code);
            }
        }
        Self(out)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codes(&self) -> &[HttpCode] {
        &self.0
    }
}

impl fmt::Display for HttpCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for code in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(code.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for HttpCodes {
    type Err = ListenerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let codes = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<HttpCode>, _>>()?;
        Ok(Self::new(codes))
    }
}

impl Serialize for HttpCodes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HttpCodes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies a listener in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerKey {
    pub load_balancer_port: u16,
    pub protocol: Protocol,
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.load_balancer_port)
    }
}

/// One forwarding rule on a load balancer.
///
/// Serialized with the declarative field names (`lb_port`, `lb_protocol`, ...).
/// Unset fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    #[serde(rename = "lb_port")]
    pub load_balancer_port: u16,

    pub instance_port: u16,

    #[serde(rename = "lb_protocol")]
    pub protocol: Protocol,

    /// Peak bandwidth in Mbps; -1 means unlimited.
    pub bandwidth: i32,

    /// Server certificate, https only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssl_certificate_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<Scheduler>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky_session: Option<Flag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky_session_type: Option<StickySessionType>,

    /// Seconds; only meaningful for insert-type sticky sessions.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cookie_timeout: u32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cookie: String,

    /// Seconds; tcp and udp only.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub persistence_timeout: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<Flag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<HealthCheckType>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub health_check_domain: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub health_check_uri: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub health_check_connect_port: u16,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub healthy_threshold: u32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub unhealthy_threshold: u32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub health_check_timeout: u32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub health_check_interval: u32,

    #[serde(default, skip_serializing_if = "HttpCodes::is_empty")]
    pub health_check_http_code: HttpCodes,
}

pub(crate) fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

impl Listener {
    /// Create a listener with only identity fields set.
    pub fn new(load_balancer_port: u16, instance_port: u16, protocol: Protocol, bandwidth: i32) -> Self {
        Self {
            load_balancer_port,
            instance_port,
            protocol,
            bandwidth,
            ssl_certificate_id: String::new(),
            scheduler: None,
            sticky_session: None,
            sticky_session_type: None,
            cookie_timeout: 0,
            cookie: String::new(),
            persistence_timeout: 0,
            health_check: None,
            health_check_type: None,
            health_check_domain: String::new(),
            health_check_uri: String::new(),
            health_check_connect_port: 0,
            healthy_threshold: 0,
            unhealthy_threshold: 0,
            health_check_timeout: 0,
            health_check_interval: 0,
            health_check_http_code: HttpCodes::default(),
        }
    }

    pub fn key(&self) -> ListenerKey {
        ListenerKey {
            load_balancer_port: self.load_balancer_port,
            protocol: self.protocol,
        }
    }

    pub fn health_check_enabled(&self) -> bool {
        self.health_check == Some(Flag::On)
    }

    pub fn sticky_session_enabled(&self) -> bool {
        self.sticky_session == Some(Flag::On)
    }

    /// Copy with every field its protocol does not define reset to zero.
    ///
    /// This is what a remote read can reconstruct, so it is the form to
    /// compare declared and described listeners in.
    pub fn projected(&self) -> Listener {
        let mut out = self.clone();
        let http_family = self.protocol.is_http_family();

        if self.protocol != Protocol::Https {
            out.ssl_certificate_id.clear();
        }
        if !http_family {
            out.sticky_session = None;
            out.sticky_session_type = None;
            out.cookie_timeout = 0;
            out.cookie.clear();
            out.health_check = None;
        }
        if http_family {
            out.persistence_timeout = 0;
        }
        if self.protocol != Protocol::Tcp {
            out.health_check_type = None;
        }
        if self.protocol == Protocol::Udp {
            out.scheduler = None;
            out.health_check_domain.clear();
            out.health_check_uri.clear();
            out.health_check_connect_port = 0;
            out.healthy_threshold = 0;
            out.unhealthy_threshold = 0;
            out.health_check_http_code = HttpCodes::default();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_is_case_insensitive() {
        assert_eq!("HTTP".parse::<Protocol>().unwrap(), Protocol::Http);
        assert_eq!(" Https ".parse::<Protocol>().unwrap(), Protocol::Https);
        assert_eq!(Protocol::Udp.to_string(), "udp");

        let err = "sctp".parse::<Protocol>().unwrap_err();
        assert_eq!(err.field, "protocol");
        assert_eq!(err.value, "sctp");
    }

    #[test]
    fn test_scheduler_aliases() {
        assert_eq!("wrr".parse::<Scheduler>().unwrap(), Scheduler::WeightedRoundRobin);
        assert_eq!(
            "round-robin".parse::<Scheduler>().unwrap(),
            Scheduler::RoundRobin
        );
        assert_eq!(Scheduler::RoundRobin.as_str(), "rr");
        assert_eq!(Scheduler::default(), Scheduler::WeightedRoundRobin);
    }

    #[test]
    fn test_http_codes_wire_format() {
        let codes: HttpCodes = "http_2xx, http_3xx,,http_2xx".parse().unwrap();
        assert_eq!(codes.codes(), &[HttpCode::Http2xx, HttpCode::Http3xx]);
        assert_eq!(codes.to_string(), "http_2xx,http_3xx");

        assert!("".parse::<HttpCodes>().unwrap().is_empty());
        assert!("http_6xx".parse::<HttpCodes>().is_err());
    }

    #[test]
    fn test_listener_key_display() {
        let listener = Listener::new(443, 8443, Protocol::Https, 10);
        assert_eq!(listener.key().to_string(), "https:443");
    }

    #[test]
    fn test_projected_clears_fields_outside_protocol() {
        let mut listener = Listener::new(53, 53, Protocol::Udp, -1);
        listener.scheduler = Some(Scheduler::RoundRobin);
        listener.sticky_session = Some(Flag::On);
        listener.cookie = "stray".to_string();
        listener.persistence_timeout = 20;
        listener.health_check_timeout = 3;

        let mut expected = Listener::new(53, 53, Protocol::Udp, -1);
        expected.persistence_timeout = 20;
        expected.health_check_timeout = 3;
        assert_eq!(listener.projected(), expected);

        let mut https = Listener::new(443, 8443, Protocol::Https, -1);
        https.ssl_certificate_id = "cert-1".to_string();
        https.persistence_timeout = 9;
        https.health_check_type = Some(HealthCheckType::Tcp);
        let projected = https.projected();
        assert_eq!(projected.ssl_certificate_id, "cert-1");
        assert_eq!(projected.persistence_timeout, 0);
        assert_eq!(projected.health_check_type, None);
    }

    #[test]
    fn test_listener_serialization_skips_unset_fields() {
        let mut listener = Listener::new(80, 8080, Protocol::Http, -1);
        listener.sticky_session = Some(Flag::Off);

        let json = serde_json::to_value(&listener).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "lb_port": 80,
                "instance_port": 8080,
                "lb_protocol": "http",
                "bandwidth": -1,
                "sticky_session": "off",
            })
        );
    }

    #[test]
    fn test_listener_deserialization_defaults() {
        let listener: Listener = serde_json::from_str(
            r#"{
                "lb_port": 443,
                "instance_port": 8443,
                "lb_protocol": "HTTPS",
                "bandwidth": 5,
                "ssl_certificate_id": "cert-1",
                "health_check_http_code": "http_2xx"
            }"#,
        )
        .unwrap();

        assert_eq!(listener.protocol, Protocol::Https);
        assert_eq!(listener.ssl_certificate_id, "cert-1");
        assert_eq!(listener.health_check_http_code.codes(), &[HttpCode::Http2xx]);
        assert_eq!(listener.scheduler, None);
        assert_eq!(listener.cookie_timeout, 0);
    }
}
