//! Remote listener attribute shapes and their normalization.
//!
//! The describe calls return one of four flat attribute bags, each carrying
//! only the fields its protocol supports. None of them names its own
//! protocol, so the caller tags the shape by wrapping it in
//! [`ListenerAttributes`].
//!
//! Each shape has an explicit conversion into [`Listener`]. The conversions
//! destructure the shape and build the listener without `..` rest patterns,
//! so a field added to either side fails to compile until it is mapped.
//! HTTPS reuses the HTTP conversion and sets its own two fields.

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{
    Flag, HealthCheckType, HttpCodes, Listener, Protocol, Scheduler, StickySessionType,
};

wire_enum! {
    /// Remote lifecycle state of a listener.
    ListenerStatus, "listener_status" {
        Running => "running",
        Stopped => "stopped",
        Starting => "starting",
        Stopping => "stopping",
        Configuring => "configuring",
    }
}

/// Attributes of a TCP listener as described by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TcpListenerAttributes {
    pub listener_port: u16,
    pub backend_server_port: u16,
    pub bandwidth: i32,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub scheduler: Option<Scheduler>,
    #[serde(default)]
    pub persistence_timeout: u32,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub health_check_type: Option<HealthCheckType>,
    #[serde(default)]
    pub health_check_domain: String,
    #[serde(rename = "HealthCheckURI", default)]
    pub health_check_uri: String,
    #[serde(default)]
    pub health_check_connect_port: u16,
    #[serde(default)]
    pub healthy_threshold: u32,
    #[serde(default)]
    pub unhealthy_threshold: u32,
    #[serde(default)]
    pub health_check_connect_timeout: u32,
    #[serde(default)]
    pub health_check_interval: u32,
    #[serde(default)]
    pub health_check_http_code: HttpCodes,
    pub status: ListenerStatus,
}

/// Attributes of a UDP listener as described by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UdpListenerAttributes {
    pub listener_port: u16,
    pub backend_server_port: u16,
    pub bandwidth: i32,
    #[serde(default)]
    pub persistence_timeout: u32,
    #[serde(default)]
    pub health_check_connect_timeout: u32,
    #[serde(default)]
    pub health_check_interval: u32,
    pub status: ListenerStatus,
}

/// Attributes of an HTTP listener as described by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpListenerAttributes {
    pub listener_port: u16,
    pub backend_server_port: u16,
    pub bandwidth: i32,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub scheduler: Option<Scheduler>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub sticky_session: Option<Flag>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub sticky_session_type: Option<StickySessionType>,
    #[serde(default)]
    pub cookie_timeout: u32,
    #[serde(default)]
    pub cookie: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub health_check: Option<Flag>,
    #[serde(default)]
    pub health_check_domain: String,
    #[serde(rename = "HealthCheckURI", default)]
    pub health_check_uri: String,
    #[serde(default)]
    pub health_check_connect_port: u16,
    #[serde(default)]
    pub healthy_threshold: u32,
    #[serde(default)]
    pub unhealthy_threshold: u32,
    #[serde(default)]
    pub health_check_timeout: u32,
    #[serde(default)]
    pub health_check_interval: u32,
    #[serde(default)]
    pub health_check_http_code: HttpCodes,
    pub status: ListenerStatus,
}

/// Attributes of an HTTPS listener as described by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpsListenerAttributes {
    #[serde(flatten)]
    pub http: HttpListenerAttributes,
    #[serde(default)]
    pub server_certificate_id: String,
}

/// A described listener, tagged with the protocol it was described under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerAttributes {
    Tcp(TcpListenerAttributes),
    Udp(UdpListenerAttributes),
    Http(HttpListenerAttributes),
    Https(HttpsListenerAttributes),
}

impl ListenerAttributes {
    pub fn protocol(&self) -> Protocol {
        match self {
            ListenerAttributes::Tcp(_) => Protocol::Tcp,
            ListenerAttributes::Udp(_) => Protocol::Udp,
            ListenerAttributes::Http(_) => Protocol::Http,
            ListenerAttributes::Https(_) => Protocol::Https,
        }
    }

    pub fn status(&self) -> ListenerStatus {
        match self {
            ListenerAttributes::Tcp(attrs) => attrs.status,
            ListenerAttributes::Udp(attrs) => attrs.status,
            ListenerAttributes::Http(attrs) => attrs.status,
            ListenerAttributes::Https(attrs) => attrs.http.status,
        }
    }

    /// Deserialize a describe response body under `protocol`.
    pub fn from_json(protocol: Protocol, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match protocol {
            Protocol::Tcp => ListenerAttributes::Tcp(serde_json::from_value(value)?),
            Protocol::Udp => ListenerAttributes::Udp(serde_json::from_value(value)?),
            Protocol::Http => ListenerAttributes::Http(serde_json::from_value(value)?),
            Protocol::Https => ListenerAttributes::Https(serde_json::from_value(value)?),
        })
    }
}

/// Flatten a described listener into its canonical form.
pub fn normalize(attributes: ListenerAttributes) -> Listener {
    match attributes {
        ListenerAttributes::Tcp(attrs) => attrs.into(),
        ListenerAttributes::Udp(attrs) => attrs.into(),
        ListenerAttributes::Http(attrs) => attrs.into(),
        ListenerAttributes::Https(attrs) => attrs.into(),
    }
}

impl From<TcpListenerAttributes> for Listener {
    fn from(attrs: TcpListenerAttributes) -> Self {
        let TcpListenerAttributes {
            listener_port,
            backend_server_port,
            bandwidth,
            scheduler,
            persistence_timeout,
            health_check_type,
            health_check_domain,
            health_check_uri,
            health_check_connect_port,
            healthy_threshold,
            unhealthy_threshold,
            health_check_connect_timeout,
            health_check_interval,
            health_check_http_code,
            status: _,
        } = attrs;

        Listener {
            load_balancer_port: listener_port,
            instance_port: backend_server_port,
            protocol: Protocol::Tcp,
            bandwidth,
            ssl_certificate_id: String::new(),
            scheduler,
            sticky_session: None,
            sticky_session_type: None,
            cookie_timeout: 0,
            cookie: String::new(),
            persistence_timeout,
            health_check: None,
            health_check_type,
            health_check_domain,
            health_check_uri,
            health_check_connect_port,
            healthy_threshold,
            unhealthy_threshold,
            health_check_timeout: health_check_connect_timeout,
            health_check_interval,
            health_check_http_code,
        }
    }
}

impl From<UdpListenerAttributes> for Listener {
    fn from(attrs: UdpListenerAttributes) -> Self {
        let UdpListenerAttributes {
            listener_port,
            backend_server_port,
            bandwidth,
            persistence_timeout,
            health_check_connect_timeout,
            health_check_interval,
            status: _,
        } = attrs;

        Listener {
            load_balancer_port: listener_port,
            instance_port: backend_server_port,
            protocol: Protocol::Udp,
            bandwidth,
            ssl_certificate_id: String::new(),
            scheduler: None,
            sticky_session: None,
            sticky_session_type: None,
            cookie_timeout: 0,
            cookie: String::new(),
            persistence_timeout,
            health_check: None,
            health_check_type: None,
            health_check_domain: String::new(),
            health_check_uri: String::new(),
            health_check_connect_port: 0,
            healthy_threshold: 0,
            unhealthy_threshold: 0,
            health_check_timeout: health_check_connect_timeout,
            health_check_interval,
            health_check_http_code: HttpCodes::default(),
        }
    }
}

impl From<HttpListenerAttributes> for Listener {
    fn from(attrs: HttpListenerAttributes) -> Self {
        let HttpListenerAttributes {
            listener_port,
            backend_server_port,
            bandwidth,
            scheduler,
            sticky_session,
            sticky_session_type,
            cookie_timeout,
            cookie,
            health_check,
            health_check_domain,
            health_check_uri,
            health_check_connect_port,
            healthy_threshold,
            unhealthy_threshold,
            health_check_timeout,
            health_check_interval,
            health_check_http_code,
            status: _,
        } = attrs;

        Listener {
            load_balancer_port: listener_port,
            instance_port: backend_server_port,
            protocol: Protocol::Http,
            bandwidth,
            ssl_certificate_id: String::new(),
            scheduler,
            sticky_session,
            sticky_session_type,
            cookie_timeout,
            cookie,
            persistence_timeout: 0,
            health_check,
            health_check_type: None,
            health_check_domain,
            health_check_uri,
            health_check_connect_port,
            healthy_threshold,
            unhealthy_threshold,
            health_check_timeout,
            health_check_interval,
            health_check_http_code,
        }
    }
}

impl From<HttpsListenerAttributes> for Listener {
    fn from(attrs: HttpsListenerAttributes) -> Self {
        let HttpsListenerAttributes {
            http,
            server_certificate_id,
        } = attrs;

        Listener {
            protocol: Protocol::Https,
            ssl_certificate_id: server_certificate_id,
            ..Listener::from(http)
        }
    }
}

/// Treat an empty string as an absent enum value.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HttpCode;

    #[test]
    fn test_tcp_connect_timeout_maps_to_health_check_timeout() {
        let attrs: TcpListenerAttributes = serde_json::from_value(serde_json::json!({
            "ListenerPort": 3306,
            "BackendServerPort": 3306,
            "Bandwidth": -1,
            "Scheduler": "wrr",
            "PersistenceTimeout": 0,
            "HealthCheckType": "tcp",
            "HealthCheckConnectTimeout": 5,
            "HealthCheckInterval": 2,
            "HealthCheckHttpCode": "",
            "Status": "running",
        }))
        .unwrap();

        let listener = normalize(ListenerAttributes::Tcp(attrs));
        assert_eq!(listener.protocol, Protocol::Tcp);
        assert_eq!(listener.health_check_timeout, 5);
        assert_eq!(listener.health_check_interval, 2);
        assert_eq!(listener.health_check_type, Some(HealthCheckType::Tcp));
        assert!(listener.health_check_http_code.is_empty());
        assert_eq!(listener.sticky_session, None);
    }

    #[test]
    fn test_udp_never_reconstructs_affinity() {
        let value = serde_json::json!({
            "ListenerPort": 53,
            "BackendServerPort": 53,
            "Bandwidth": 5,
            "PersistenceTimeout": 10,
            "StickySession": "on",
            "Cookie": "stray",
            "Status": "stopped",
        });

        let attrs = ListenerAttributes::from_json(Protocol::Udp, value).unwrap();
        assert_eq!(attrs.status(), ListenerStatus::Stopped);

        let listener = normalize(attrs);
        let mut expected = Listener::new(53, 53, Protocol::Udp, 5);
        expected.persistence_timeout = 10;
        assert_eq!(listener, expected);
    }

    #[test]
    fn test_http_empty_enum_strings_are_unset() {
        let value = serde_json::json!({
            "ListenerPort": 80,
            "BackendServerPort": 8080,
            "Bandwidth": -1,
            "Scheduler": "wrr",
            "StickySession": "off",
            "StickySessionType": "",
            "HealthCheck": "off",
            "Status": "running",
        });

        let listener = normalize(ListenerAttributes::from_json(Protocol::Http, value).unwrap());
        assert_eq!(listener.sticky_session, Some(Flag::Off));
        assert_eq!(listener.sticky_session_type, None);
        assert_eq!(listener.health_check, Some(Flag::Off));
        assert_eq!(listener.scheduler, Some(Scheduler::WeightedRoundRobin));
    }

    #[test]
    fn test_https_attaches_protocol_and_certificate() {
        let value = serde_json::json!({
            "ListenerPort": 443,
            "BackendServerPort": 8443,
            "Bandwidth": 100,
            "StickySession": "on",
            "StickySessionType": "server",
            "Cookie": "SESSIONID",
            "HealthCheck": "on",
            "HealthCheckDomain": "example.com",
            "HealthCheckURI": "/healthz",
            "HealthCheckConnectPort": 8443,
            "HealthyThreshold": 3,
            "UnhealthyThreshold": 2,
            "HealthCheckTimeout": 5,
            "HealthCheckInterval": 2,
            "HealthCheckHttpCode": "http_2xx,http_3xx",
            "ServerCertificateId": "cert-9",
            "Status": "configuring",
        });

        let attrs = ListenerAttributes::from_json(Protocol::Https, value).unwrap();
        assert_eq!(attrs.protocol(), Protocol::Https);
        assert_eq!(attrs.status(), ListenerStatus::Configuring);

        let listener = normalize(attrs);
        assert_eq!(listener.protocol, Protocol::Https);
        assert_eq!(listener.ssl_certificate_id, "cert-9");
        assert_eq!(listener.sticky_session_type, Some(StickySessionType::Server));
        assert_eq!(listener.cookie, "SESSIONID");
        assert_eq!(listener.health_check_uri, "/healthz");
        assert_eq!(
            listener.health_check_http_code.codes(),
            &[HttpCode::Http2xx, HttpCode::Http3xx]
        );
        assert_eq!(listener.persistence_timeout, 0);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let value = serde_json::json!({
            "ListenerPort": 53,
            "BackendServerPort": 53,
            "Bandwidth": 5,
            "Status": "exploded",
        });

        assert!(ListenerAttributes::from_json(Protocol::Udp, value).is_err());
    }
}
