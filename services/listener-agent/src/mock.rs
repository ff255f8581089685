//! In-memory load balancer API for testing and dry runs.
//!
//! Listeners created through the mock start in `configuring` and report
//! `stopped` after a configurable number of describe calls, mirroring the
//! asynchronous provisioning of the real API. Starting a stopped listener
//! moves it to `running`. Every call is recorded, and failures can be
//! injected per operation and port.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use slb_listener::{
    build, HttpListenerArgs, HttpListenerAttributes, HttpsListenerAttributes, Listener,
    ListenerAttributes, ListenerRequest, ListenerStatus, Protocol, TcpListenerAttributes,
    UdpListenerAttributes, ValidationError,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::api::{ApiError, SlbApi};

/// A recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Create { port: u16, protocol: Protocol },
    Delete { port: u16 },
    Start { port: u16 },
    Describe { port: u16, protocol: Protocol },
    DescribePorts,
}

/// Operations a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MockOperation {
    Create,
    Delete,
    Start,
    Describe,
}

#[derive(Debug, Clone)]
struct MockListener {
    request: ListenerRequest,
    status: ListenerStatus,
    polls_until_stopped: u32,
}

#[derive(Debug, Default)]
struct MockState {
    listeners: BTreeMap<(String, u16), MockListener>,
    calls: Vec<MockCall>,
    failures: BTreeSet<(MockOperation, u16)>,
    request_counter: u64,
}

/// Mock load balancer API.
pub struct MockSlbApi {
    state: Mutex<MockState>,

    /// Describe calls a new listener answers with `configuring`.
    stopped_after: Option<u32>,
}

impl MockSlbApi {
    /// Create a mock whose listeners report `stopped` on the first describe.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            stopped_after: Some(0),
        }
    }

    /// Create a mock whose listeners stay `configuring` for `polls` describes.
    pub fn stopped_after(polls: u32) -> Self {
        Self {
            stopped_after: Some(polls),
            ..Self::new()
        }
    }

    /// Create a mock whose listeners never leave `configuring`.
    pub fn never_stopping() -> Self {
        Self {
            stopped_after: None,
            ..Self::new()
        }
    }

    /// Make every `operation` on `port` fail.
    pub async fn fail_on(&self, operation: MockOperation, port: u16) {
        self.state.lock().await.failures.insert((operation, port));
    }

    /// Place a running listener on the load balancer without recording a call.
    pub async fn insert_listener(
        &self,
        load_balancer_id: &str,
        listener: &Listener,
    ) -> Result<(), ValidationError> {
        let request = build(load_balancer_id, listener)?;
        self.state.lock().await.listeners.insert(
            (load_balancer_id.to_string(), listener.load_balancer_port),
            MockListener {
                request,
                status: ListenerStatus::Running,
                polls_until_stopped: 0,
            },
        );
        Ok(())
    }

    /// All calls made so far, in order.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    /// Remote status of the listener on `port`, if any.
    pub async fn status(&self, load_balancer_id: &str, port: u16) -> Option<ListenerStatus> {
        self.state
            .lock()
            .await
            .listeners
            .get(&(load_balancer_id.to_string(), port))
            .map(|l| l.status)
    }

    fn injected(state: &MockState, operation: MockOperation, port: u16) -> Result<(), ApiError> {
        if state.failures.contains(&(operation, port)) {
            return Err(ApiError::api(
                500,
                "InternalError",
                format!("injected {operation:?} failure on port {port}"),
            ));
        }
        Ok(())
    }
}

impl Default for MockSlbApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlbApi for MockSlbApi {
    async fn create_listener(&self, request: &ListenerRequest) -> Result<String, ApiError> {
        let port = request.listener_port();
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::Create {
            port,
            protocol: request.protocol(),
        });
        Self::injected(&state, MockOperation::Create, port)?;

        let key = (request.load_balancer_id().to_string(), port);
        if state.listeners.contains_key(&key) {
            return Err(ApiError::api(
                400,
                "ListenerAlreadyExists",
                format!("listener port {port} is already in use"),
            ));
        }

        info!(port, protocol = %request.protocol(), "[MOCK] Creating listener");

        let (status, polls_until_stopped) = match self.stopped_after {
            Some(0) => (ListenerStatus::Stopped, 0),
            Some(n) => (ListenerStatus::Configuring, n),
            None => (ListenerStatus::Configuring, u32::MAX),
        };
        state.listeners.insert(
            key,
            MockListener {
                request: request.clone(),
                status,
                polls_until_stopped,
            },
        );

        state.request_counter += 1;
        Ok(format!("req_{:016x}", state.request_counter))
    }

    async fn delete_listener(&self, load_balancer_id: &str, port: u16) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::Delete { port });
        Self::injected(&state, MockOperation::Delete, port)?;

        info!(port, "[MOCK] Deleting listener");

        state
            .listeners
            .remove(&(load_balancer_id.to_string(), port))
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("no listener on port {port}")))
    }

    async fn start_listener(&self, load_balancer_id: &str, port: u16) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::Start { port });
        Self::injected(&state, MockOperation::Start, port)?;

        let listener = state
            .listeners
            .get_mut(&(load_balancer_id.to_string(), port))
            .ok_or_else(|| ApiError::NotFound(format!("no listener on port {port}")))?;

        if listener.status != ListenerStatus::Stopped {
            return Err(ApiError::api(
                400,
                "OperationFailed.ListenerStatusNotSupport",
                format!("listener on port {port} is {}", listener.status),
            ));
        }

        info!(port, "[MOCK] Starting listener");
        listener.status = ListenerStatus::Running;
        Ok(())
    }

    async fn describe_listener(
        &self,
        load_balancer_id: &str,
        port: u16,
        protocol: Protocol,
    ) -> Result<Option<ListenerAttributes>, ApiError> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::Describe { port, protocol });
        Self::injected(&state, MockOperation::Describe, port)?;

        let Some(listener) = state.listeners.get_mut(&(load_balancer_id.to_string(), port)) else {
            return Ok(None);
        };
        if listener.request.protocol() != protocol {
            return Ok(None);
        }

        if listener.status == ListenerStatus::Configuring {
            if listener.polls_until_stopped <= 1 {
                listener.status = ListenerStatus::Stopped;
            } else {
                listener.polls_until_stopped -= 1;
            }
        }

        debug!(port, status = %listener.status, "[MOCK] Describing listener");
        Ok(Some(echo_attributes(&listener.request, listener.status)))
    }

    async fn describe_listener_ports(&self, load_balancer_id: &str) -> Result<Vec<u16>, ApiError> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::DescribePorts);

        Ok(state
            .listeners
            .keys()
            .filter(|(lb, _)| lb == load_balancer_id)
            .map(|(_, port)| *port)
            .collect())
    }
}

/// The attributes the remote reports for a listener created from `request`.
pub fn echo_attributes(request: &ListenerRequest, status: ListenerStatus) -> ListenerAttributes {
    match request {
        ListenerRequest::Tcp(args) => ListenerAttributes::Tcp(TcpListenerAttributes {
            listener_port: args.listener_port,
            backend_server_port: args.backend_server_port,
            bandwidth: args.bandwidth,
            scheduler: args.scheduler,
            persistence_timeout: args.persistence_timeout,
            health_check_type: args.health_check_type,
            health_check_domain: args.health_check_domain.clone(),
            health_check_uri: args.health_check_uri.clone(),
            health_check_connect_port: args.health_check_connect_port,
            healthy_threshold: args.healthy_threshold,
            unhealthy_threshold: args.unhealthy_threshold,
            health_check_connect_timeout: args.health_check_connect_timeout,
            health_check_interval: args.health_check_interval,
            health_check_http_code: args.health_check_http_code.clone(),
            status,
        }),
        ListenerRequest::Udp(args) => ListenerAttributes::Udp(UdpListenerAttributes {
            listener_port: args.listener_port,
            backend_server_port: args.backend_server_port,
            bandwidth: args.bandwidth,
            persistence_timeout: args.persistence_timeout,
            health_check_connect_timeout: args.health_check_connect_timeout,
            health_check_interval: args.health_check_interval,
            status,
        }),
        ListenerRequest::Http(args) => ListenerAttributes::Http(echo_http(args, status)),
        ListenerRequest::Https(args) => ListenerAttributes::Https(HttpsListenerAttributes {
            http: echo_http(&args.http, status),
            server_certificate_id: args.server_certificate_id.clone(),
        }),
    }
}

fn echo_http(args: &HttpListenerArgs, status: ListenerStatus) -> HttpListenerAttributes {
    HttpListenerAttributes {
        listener_port: args.listener_port,
        backend_server_port: args.backend_server_port,
        bandwidth: args.bandwidth,
        scheduler: args.scheduler,
        sticky_session: args.sticky_session,
        sticky_session_type: args.sticky_session_type,
        cookie_timeout: args.cookie_timeout,
        cookie: args.cookie.clone(),
        health_check: args.health_check,
        health_check_domain: args.health_check_domain.clone(),
        health_check_uri: args.health_check_uri.clone(),
        health_check_connect_port: args.health_check_connect_port,
        healthy_threshold: args.healthy_threshold,
        unhealthy_threshold: args.unhealthy_threshold,
        health_check_timeout: args.health_check_timeout,
        health_check_interval: args.health_check_interval,
        health_check_http_code: args.health_check_http_code.clone(),
        status,
    }
}
