//! Build a create request, read the equivalent listener back, normalize it.

use rstest::rstest;
use slb_agent::mock::echo_attributes;
use slb_listener::{
    build, normalize, Flag, HealthCheckType, HttpCode, HttpCodes, Listener, ListenerAttributes,
    ListenerStatus, Protocol, Scheduler, StickySessionType,
};

/// A listener with every field set, valid for any protocol.
fn fully_populated(protocol: Protocol) -> Listener {
    Listener {
        load_balancer_port: 443,
        instance_port: 8443,
        protocol,
        bandwidth: 20,
        ssl_certificate_id: "cert-1234".to_string(),
        scheduler: Some(Scheduler::RoundRobin),
        sticky_session: Some(Flag::On),
        sticky_session_type: Some(StickySessionType::Insert),
        cookie_timeout: 600,
        cookie: "SERVERID".to_string(),
        persistence_timeout: 120,
        health_check: Some(Flag::On),
        health_check_type: Some(HealthCheckType::Http),
        health_check_domain: "example.com".to_string(),
        health_check_uri: "/healthz".to_string(),
        health_check_connect_port: 8443,
        healthy_threshold: 3,
        unhealthy_threshold: 4,
        health_check_timeout: 5,
        health_check_interval: 2,
        health_check_http_code: HttpCodes::new(vec![HttpCode::Http2xx, HttpCode::Http3xx]),
    }
}

#[rstest]
fn echoed_listener_normalizes_to_its_projection(
    #[values(Protocol::Tcp, Protocol::Udp, Protocol::Http, Protocol::Https)] protocol: Protocol,
) {
    let listener = fully_populated(protocol);
    let request = build("lb-rt", &listener).unwrap();

    let read_back = normalize(echo_attributes(&request, ListenerStatus::Running));
    assert_eq!(read_back, listener.projected());
    assert_eq!(read_back.protocol, protocol);
}

#[rstest]
fn wire_request_parses_as_attributes(
    #[values(Protocol::Tcp, Protocol::Udp, Protocol::Http, Protocol::Https)] protocol: Protocol,
) {
    let listener = fully_populated(protocol);
    let request = build("lb-rt", &listener).unwrap();

    let mut body = serde_json::to_value(&request).unwrap();
    body["Status"] = serde_json::Value::from("stopped");

    let attributes = ListenerAttributes::from_json(protocol, body).unwrap();
    assert_eq!(attributes.status(), ListenerStatus::Stopped);
    assert_eq!(normalize(attributes), listener.projected());
}

#[test]
fn udp_round_trip_never_carries_affinity_or_http_checks() {
    let listener = fully_populated(Protocol::Udp);
    let request = build("lb-rt", &listener).unwrap();
    let read_back = normalize(echo_attributes(&request, ListenerStatus::Stopped));

    assert_eq!(read_back.sticky_session, None);
    assert_eq!(read_back.sticky_session_type, None);
    assert_eq!(read_back.cookie_timeout, 0);
    assert!(read_back.cookie.is_empty());
    assert_eq!(read_back.scheduler, None);
    assert!(read_back.health_check_uri.is_empty());
    assert!(read_back.health_check_http_code.is_empty());
    assert!(read_back.ssl_certificate_id.is_empty());

    assert_eq!(read_back.persistence_timeout, 120);
    assert_eq!(read_back.health_check_timeout, 5);
    assert_eq!(read_back.health_check_interval, 2);
}

#[test]
fn tcp_round_trip_keeps_connect_timeout() {
    let listener = fully_populated(Protocol::Tcp);
    let request = build("lb-rt", &listener).unwrap();
    let read_back = normalize(echo_attributes(&request, ListenerStatus::Running));

    assert_eq!(read_back.health_check_timeout, 5);
    assert_eq!(read_back.health_check_type, Some(HealthCheckType::Http));
    assert_eq!(read_back.health_check, None);
}
