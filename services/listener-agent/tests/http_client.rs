//! HTTP client behavior against a stubbed load balancer endpoint.

use serde_json::json;
use slb_agent::{ApiError, HttpSlbClient, SlbApi};
use slb_listener::{build, Flag, Listener, ListenerAttributes, ListenerStatus, Protocol};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LB: &str = "lb-http";

fn client(server: &MockServer) -> HttpSlbClient {
    HttpSlbClient::with_endpoint(&server.uri(), Some("secret-token")).unwrap()
}

#[tokio::test]
async fn create_posts_action_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_partial_json(json!({
            "Action": "CreateLoadBalancerHTTPListener",
            "LoadBalancerId": LB,
            "ListenerPort": 80,
            "BackendServerPort": 8080,
            "Bandwidth": -1,
            "StickySession": "off",
            "HealthCheck": "off"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "RequestId": "req-42" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut listener = Listener::new(80, 8080, Protocol::Http, -1);
    listener.sticky_session = Some(Flag::Off);
    listener.health_check = Some(Flag::Off);
    let request = build(LB, &listener).unwrap();

    let request_id = client(&server).create_listener(&request).await.unwrap();
    assert_eq!(request_id, "req-42");
}

#[tokio::test]
async fn describe_parses_protocol_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "Action": "DescribeLoadBalancerUDPListenerAttribute",
            "ListenerPort": 53
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RequestId": "req-1",
            "ListenerPort": 53,
            "BackendServerPort": 5353,
            "Bandwidth": -1,
            "Status": "stopped",
            "PersistenceTimeout": 30,
            "HealthCheckConnectTimeout": 5,
            "HealthCheckInterval": 2
        })))
        .mount(&server)
        .await;

    let attributes = client(&server)
        .describe_listener(LB, 53, Protocol::Udp)
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(attributes, ListenerAttributes::Udp(_)));
    assert_eq!(attributes.status(), ListenerStatus::Stopped);

    let listener = slb_listener::normalize(attributes);
    assert_eq!(listener.instance_port, 5353);
    assert_eq!(listener.persistence_timeout, 30);
    assert_eq!(listener.health_check_timeout, 5);
}

#[tokio::test]
async fn describe_unsupported_protocol_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "Code": "UnsupportedProtocalPort",
            "Message": "The specified port does not support this protocol.",
            "RequestId": "req-2"
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .describe_listener(LB, 80, Protocol::Https)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn api_errors_keep_code_and_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "Code": "Forbidden.RAM",
            "Message": "User not authorized to operate on the specified resource.",
            "RequestId": "req-3"
        })))
        .mount(&server)
        .await;

    let err = client(&server).start_listener(LB, 80).await.unwrap_err();
    match err {
        ApiError::Api {
            status,
            code,
            request_id,
            ..
        } => {
            assert_eq!(status, 403);
            assert_eq!(code, "Forbidden.RAM");
            assert_eq!(request_id.as_deref(), Some("req-3"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client(&server).delete_listener(LB, 80).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Api { status: 502, ref message, .. } if message == "Bad Gateway"
    ));
}

#[tokio::test]
async fn listener_ports_are_listed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "Action": "DescribeLoadBalancerAttribute",
            "LoadBalancerId": LB
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LoadBalancerId": LB,
            "ListenerPorts": { "ListenerPort": [80, 443] }
        })))
        .mount(&server)
        .await;

    let ports = client(&server).describe_listener_ports(LB).await.unwrap();
    assert_eq!(ports, vec![80, 443]);
}
