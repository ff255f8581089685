//! Reading the current listener set back from the load balancer.

use slb_listener::{normalize, Listener, Protocol};
use tracing::debug;

use crate::api::SlbApi;
use crate::apply::{ApplyError, Operation};

/// Describe every configured port under every protocol and normalize what exists.
///
/// A protocol the port is not configured for contributes nothing. The
/// result is ordered by port, then protocol.
pub async fn read_listeners(
    api: &dyn SlbApi,
    load_balancer_id: &str,
) -> Result<Vec<Listener>, ApplyError> {
    let mut ports = api
        .describe_listener_ports(load_balancer_id)
        .await
        .map_err(|e| ApplyError::remote(Operation::DescribePorts, load_balancer_id, e))?;
    ports.sort_unstable();
    ports.dedup();

    let mut listeners = Vec::new();
    for port in ports {
        for &protocol in Protocol::ALL {
            let attributes = api
                .describe_listener(load_balancer_id, port, protocol)
                .await
                .map_err(|e| ApplyError::remote(Operation::Describe, format!("{protocol}:{port}"), e))?;

            if let Some(attributes) = attributes {
                listeners.push(normalize(attributes));
            }
        }
    }

    listeners.sort_by_key(Listener::key);
    debug!(
        load_balancer_id,
        count = listeners.len(),
        "Read current listeners"
    );
    Ok(listeners)
}

#[cfg(test)]
mod tests {
    use slb_listener::Flag;

    use super::*;
    use crate::mock::{MockOperation, MockSlbApi};

    const LB: &str = "lb-read";

    #[tokio::test]
    async fn test_read_normalizes_each_listener() {
        let api = MockSlbApi::new();
        let udp = Listener::new(53, 5353, Protocol::Udp, 10);
        let mut http = Listener::new(80, 8080, Protocol::Http, -1);
        http.sticky_session = Some(Flag::Off);
        http.health_check = Some(Flag::Off);
        api.insert_listener(LB, &http).await.unwrap();
        api.insert_listener(LB, &udp).await.unwrap();

        let listeners = read_listeners(&api, LB).await.unwrap();
        assert_eq!(listeners, vec![udp.projected(), http.projected()]);
    }

    #[tokio::test]
    async fn test_read_empty_load_balancer() {
        let api = MockSlbApi::new();
        assert!(read_listeners(&api, LB).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_surfaces_describe_errors() {
        let api = MockSlbApi::new();
        api.insert_listener(LB, &Listener::new(22, 22, Protocol::Tcp, -1))
            .await
            .unwrap();
        api.fail_on(MockOperation::Describe, 22).await;

        let err = read_listeners(&api, LB).await.unwrap_err();
        assert!(matches!(
            err,
            ApplyError::Remote { operation: Operation::Describe, ref target, .. } if target == "tcp:22"
        ));
    }
}
