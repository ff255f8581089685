//! HTTP client for the load balancer API.
//!
//! Every call is an RPC-style `POST {endpoint}` whose JSON body names the
//! action and carries its parameters:
//!
//! ```json
//! { "Action": "StartLoadBalancerListener", "LoadBalancerId": "lb-1", "ListenerPort": 80 }
//! ```
//!
//! Failures come back as `{"Code", "Message", "RequestId"}` with a non-2xx
//! status. Request signing belongs to the transport in front of the
//! endpoint and is not done here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use slb_listener::{ListenerAttributes, ListenerRequest, Protocol};
use tracing::{debug, error};

use crate::api::{ApiError, SlbApi, NOT_FOUND_CODES};
use crate::config::Config;

/// Load balancer API client.
pub struct HttpSlbClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSlbClient {
    /// Create a client from agent configuration.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Self::with_endpoint(&config.endpoint, config.access_token.as_deref())
    }

    /// Create a client for `endpoint`, optionally sending a bearer token.
    pub fn with_endpoint(endpoint: &str, access_token: Option<&str>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::api(0, "InvalidToken", e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Invoke `action` with `params` (a JSON object).
    async fn call<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<T, ApiError> {
        let mut body = match params {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        body.insert("Action".to_string(), Value::from(action));

        debug!(action, endpoint = %self.endpoint, "Calling load balancer API");

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let details: ErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ErrorBody {
                code: status.to_string(),
                message: text.clone(),
                request_id: None,
            });

            if NOT_FOUND_CODES.contains(&details.code.as_str()) {
                debug!(action, code = %details.code, "Remote object not found");
                return Err(ApiError::NotFound(details.message));
            }

            error!(
                action,
                status = %status,
                code = %details.code,
                message = %details.message,
                "Load balancer API error"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                code: details.code,
                message: details.message,
                request_id: details.request_id,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RequestIdResponse {
    #[serde(default)]
    request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerAttributeResponse {
    #[serde(default)]
    listener_ports: ListenerPorts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListenerPorts {
    #[serde(default)]
    listener_port: Vec<u16>,
}

fn describe_action(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Tcp => "DescribeLoadBalancerTCPListenerAttribute",
        Protocol::Udp => "DescribeLoadBalancerUDPListenerAttribute",
        Protocol::Http => "DescribeLoadBalancerHTTPListenerAttribute",
        Protocol::Https => "DescribeLoadBalancerHTTPSListenerAttribute",
    }
}

#[async_trait]
impl SlbApi for HttpSlbClient {
    async fn create_listener(&self, request: &ListenerRequest) -> Result<String, ApiError> {
        let params = serde_json::to_value(request)?;
        let response: RequestIdResponse = self.call(request.action(), params).await?;
        Ok(response.request_id)
    }

    async fn delete_listener(&self, load_balancer_id: &str, port: u16) -> Result<(), ApiError> {
        let params = json!({ "LoadBalancerId": load_balancer_id, "ListenerPort": port });
        let _: RequestIdResponse = self.call("DeleteLoadBalancerListener", params).await?;
        Ok(())
    }

    async fn start_listener(&self, load_balancer_id: &str, port: u16) -> Result<(), ApiError> {
        let params = json!({ "LoadBalancerId": load_balancer_id, "ListenerPort": port });
        let _: RequestIdResponse = self.call("StartLoadBalancerListener", params).await?;
        Ok(())
    }

    async fn describe_listener(
        &self,
        load_balancer_id: &str,
        port: u16,
        protocol: Protocol,
    ) -> Result<Option<ListenerAttributes>, ApiError> {
        let params = json!({ "LoadBalancerId": load_balancer_id, "ListenerPort": port });
        match self.call::<Value>(describe_action(protocol), params).await {
            Ok(value) => Ok(Some(ListenerAttributes::from_json(protocol, value)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn describe_listener_ports(&self, load_balancer_id: &str) -> Result<Vec<u16>, ApiError> {
        let params = json!({ "LoadBalancerId": load_balancer_id });
        let response: LoadBalancerAttributeResponse =
            self.call("DescribeLoadBalancerAttribute", params).await?;
        Ok(response.listener_ports.listener_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_deserialization() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"Code":"UnsupportedProtocalPort","Message":"no such listener","RequestId":"req-1"}"#,
        )
        .unwrap();
        assert_eq!(body.code, "UnsupportedProtocalPort");
        assert_eq!(body.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_listener_ports_deserialization() {
        let response: LoadBalancerAttributeResponse = serde_json::from_str(
            r#"{"LoadBalancerId":"lb-1","ListenerPorts":{"ListenerPort":[80,443]}}"#,
        )
        .unwrap();
        assert_eq!(response.listener_ports.listener_port, vec![80, 443]);

        let empty: LoadBalancerAttributeResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.listener_ports.listener_port.is_empty());
    }

    #[test]
    fn test_describe_actions() {
        assert_eq!(
            describe_action(Protocol::Https),
            "DescribeLoadBalancerHTTPSListenerAttribute"
        );
        assert_eq!(
            describe_action(Protocol::Udp),
            "DescribeLoadBalancerUDPListenerAttribute"
        );
    }
}
