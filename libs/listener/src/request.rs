//! Protocol-specific create requests.
//!
//! Each protocol has its own request shape carrying only the fields the
//! remote API accepts for it. [`build`] projects a canonical [`Listener`]
//! into the matching shape; it performs no I/O.

use serde::Serialize;

use crate::model::{
    is_zero, Flag, HealthCheckType, HttpCodes, Listener, Protocol, Scheduler, StickySessionType,
};
use crate::validate::validate;
use crate::{ValidationError, ValidationErrorKind};

/// Create request for a TCP listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TcpListenerArgs {
    pub load_balancer_id: String,
    pub listener_port: u16,
    pub backend_server_port: u16,
    pub bandwidth: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<Scheduler>,
    #[serde(skip_serializing_if = "is_zero")]
    pub persistence_timeout: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<HealthCheckType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub health_check_domain: String,
    #[serde(rename = "HealthCheckURI", skip_serializing_if = "String::is_empty")]
    pub health_check_uri: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub health_check_connect_port: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub healthy_threshold: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub unhealthy_threshold: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub health_check_connect_timeout: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub health_check_interval: u32,
    #[serde(skip_serializing_if = "HttpCodes::is_empty")]
    pub health_check_http_code: HttpCodes,
}

/// Create request for a UDP listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UdpListenerArgs {
    pub load_balancer_id: String,
    pub listener_port: u16,
    pub backend_server_port: u16,
    pub bandwidth: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub persistence_timeout: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub health_check_connect_timeout: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub health_check_interval: u32,
}

/// Create request for an HTTP listener; also the shared block of HTTPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpListenerArgs {
    pub load_balancer_id: String,
    pub listener_port: u16,
    pub backend_server_port: u16,
    pub bandwidth: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<Scheduler>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky_session: Option<Flag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky_session_type: Option<StickySessionType>,
    #[serde(skip_serializing_if = "is_zero")]
    pub cookie_timeout: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cookie: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<Flag>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub health_check_domain: String,
    #[serde(rename = "HealthCheckURI", skip_serializing_if = "String::is_empty")]
    pub health_check_uri: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub health_check_connect_port: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub healthy_threshold: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub unhealthy_threshold: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub health_check_timeout: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub health_check_interval: u32,
    #[serde(skip_serializing_if = "HttpCodes::is_empty")]
    pub health_check_http_code: HttpCodes,
}

/// Create request for an HTTPS listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpsListenerArgs {
    #[serde(flatten)]
    pub http: HttpListenerArgs,
    pub server_certificate_id: String,
}

/// A create request for one of the four listener protocols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ListenerRequest {
    Tcp(TcpListenerArgs),
    Udp(UdpListenerArgs),
    Http(HttpListenerArgs),
    Https(HttpsListenerArgs),
}

impl ListenerRequest {
    pub fn protocol(&self) -> Protocol {
        match self {
            ListenerRequest::Tcp(_) => Protocol::Tcp,
            ListenerRequest::Udp(_) => Protocol::Udp,
            ListenerRequest::Http(_) => Protocol::Http,
            ListenerRequest::Https(_) => Protocol::Https,
        }
    }

    pub fn load_balancer_id(&self) -> &str {
        match self {
            ListenerRequest::Tcp(args) => &args.load_balancer_id,
            ListenerRequest::Udp(args) => &args.load_balancer_id,
            ListenerRequest::Http(args) => &args.load_balancer_id,
            ListenerRequest::Https(args) => &args.http.load_balancer_id,
        }
    }

    pub fn listener_port(&self) -> u16 {
        match self {
            ListenerRequest::Tcp(args) => args.listener_port,
            ListenerRequest::Udp(args) => args.listener_port,
            ListenerRequest::Http(args) => args.listener_port,
            ListenerRequest::Https(args) => args.http.listener_port,
        }
    }

    /// Remote API action that creates this listener.
    pub fn action(&self) -> &'static str {
        match self {
            ListenerRequest::Tcp(_) => "CreateLoadBalancerTCPListener",
            ListenerRequest::Udp(_) => "CreateLoadBalancerUDPListener",
            ListenerRequest::Http(_) => "CreateLoadBalancerHTTPListener",
            ListenerRequest::Https(_) => "CreateLoadBalancerHTTPSListener",
        }
    }
}

/// Build the create request for `listener` on load balancer `load_balancer_id`.
///
/// Http and https listeners are validated first; the validation error is
/// returned untouched. Https additionally requires a certificate.
pub fn build(load_balancer_id: &str, listener: &Listener) -> Result<ListenerRequest, ValidationError> {
    let request = match listener.protocol {
        Protocol::Tcp => ListenerRequest::Tcp(tcp_args(load_balancer_id, listener)),
        Protocol::Udp => ListenerRequest::Udp(udp_args(load_balancer_id, listener)),
        Protocol::Http => ListenerRequest::Http(http_args(load_balancer_id, listener)?),
        Protocol::Https => ListenerRequest::Https(https_args(load_balancer_id, listener)?),
    };
    Ok(request)
}

fn tcp_args(load_balancer_id: &str, listener: &Listener) -> TcpListenerArgs {
    TcpListenerArgs {
        load_balancer_id: load_balancer_id.to_string(),
        listener_port: listener.load_balancer_port,
        backend_server_port: listener.instance_port,
        bandwidth: listener.bandwidth,
        scheduler: listener.scheduler,
        persistence_timeout: listener.persistence_timeout,
        health_check_type: listener.health_check_type,
        health_check_domain: listener.health_check_domain.clone(),
        health_check_uri: listener.health_check_uri.clone(),
        health_check_connect_port: listener.health_check_connect_port,
        healthy_threshold: listener.healthy_threshold,
        unhealthy_threshold: listener.unhealthy_threshold,
        health_check_connect_timeout: listener.health_check_timeout,
        health_check_interval: listener.health_check_interval,
        health_check_http_code: listener.health_check_http_code.clone(),
    }
}

fn udp_args(load_balancer_id: &str, listener: &Listener) -> UdpListenerArgs {
    UdpListenerArgs {
        load_balancer_id: load_balancer_id.to_string(),
        listener_port: listener.load_balancer_port,
        backend_server_port: listener.instance_port,
        bandwidth: listener.bandwidth,
        persistence_timeout: listener.persistence_timeout,
        health_check_connect_timeout: listener.health_check_timeout,
        health_check_interval: listener.health_check_interval,
    }
}

fn http_args(load_balancer_id: &str, listener: &Listener) -> Result<HttpListenerArgs, ValidationError> {
    validate(listener)?;

    Ok(HttpListenerArgs {
        load_balancer_id: load_balancer_id.to_string(),
        listener_port: listener.load_balancer_port,
        backend_server_port: listener.instance_port,
        bandwidth: listener.bandwidth,
        scheduler: listener.scheduler,
        sticky_session: listener.sticky_session,
        sticky_session_type: listener.sticky_session_type,
        cookie_timeout: listener.cookie_timeout,
        cookie: listener.cookie.clone(),
        health_check: listener.health_check,
        health_check_domain: listener.health_check_domain.clone(),
        health_check_uri: listener.health_check_uri.clone(),
        health_check_connect_port: listener.health_check_connect_port,
        healthy_threshold: listener.healthy_threshold,
        unhealthy_threshold: listener.unhealthy_threshold,
        health_check_timeout: listener.health_check_timeout,
        health_check_interval: listener.health_check_interval,
        health_check_http_code: listener.health_check_http_code.clone(),
    })
}

fn https_args(load_balancer_id: &str, listener: &Listener) -> Result<HttpsListenerArgs, ValidationError> {
    let http = http_args(load_balancer_id, listener)?;

    if listener.ssl_certificate_id.is_empty() {
        return Err(ValidationError::new(
            listener.key(),
            ValidationErrorKind::CertificateRequired,
        ));
    }

    Ok(HttpsListenerArgs {
        http,
        server_certificate_id: listener.ssl_certificate_id.clone(),
    })
}
