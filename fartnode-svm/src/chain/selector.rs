use fartnode::{Cluster, Commitment, EndpointList, RpcPurpose, explorer_tx_url};
use std::fmt;
use std::sync::Arc;

use crate::chain::pool::{EndpointPool, RpcConnector};
use crate::chain::rpc::RpcClientLike;

/// A live RPC client bound to the endpoint and commitment it was opened with.
pub struct Connection<C> {
    /// Normalized endpoint URL.
    pub endpoint: String,
    /// Default commitment of the underlying client.
    pub commitment: Commitment,
    /// The shared client.
    pub client: Arc<C>,
}

impl<C> Clone for Connection<C> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            commitment: self.commitment,
            client: Arc::clone(&self.client),
        }
    }
}

impl<C> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("commitment", &self.commitment)
            .finish_non_exhaustive()
    }
}

impl<C> Connection<C> {
    /// Wraps an existing client.
    pub fn new(endpoint: impl Into<String>, commitment: Commitment, client: Arc<C>) -> Self {
        Self {
            endpoint: endpoint.into(),
            commitment,
            client,
        }
    }

    /// Cluster inferred from the endpoint URL.
    #[must_use]
    pub fn cluster(&self) -> Cluster {
        Cluster::infer(&self.endpoint)
    }

    /// Explorer link for `signature` on this connection's cluster.
    #[must_use]
    pub fn explorer_url(&self, signature: &str) -> String {
        explorer_tx_url(signature, &self.endpoint)
    }
}

/// One endpoint that failed its liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    /// The endpoint URL.
    pub endpoint: String,
    /// The probe error message.
    pub message: String,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.endpoint, self.message)
    }
}

/// Errors raised while selecting an endpoint.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// Every candidate endpoint failed its liveness probe.
    #[error(
        "No healthy RPC endpoints available (commitment={commitment}, purpose={purpose}). Tried: {}",
        format_failures(failures)
    )]
    NoHealthyEndpoint {
        /// Commitment that was requested.
        commitment: Commitment,
        /// Purpose that was requested.
        purpose: RpcPurpose,
        /// Every endpoint tried, with its failure.
        failures: Vec<EndpointFailure>,
    },
}

fn format_failures(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Priority-ordered failover over a shared [`EndpointPool`].
///
/// The first endpoint that is known healthy, or that answers a fresh probe,
/// wins. Endpoints are tried strictly in order; there is no load balancing.
pub struct RpcSelector<K: RpcConnector> {
    pool: Arc<EndpointPool<K>>,
    endpoints: EndpointList,
}

impl<K: RpcConnector> Clone for RpcSelector<K> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            endpoints: self.endpoints.clone(),
        }
    }
}

impl<K: RpcConnector> fmt::Debug for RpcSelector<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSelector")
            .field("pool", &self.pool)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl<K: RpcConnector> RpcSelector<K> {
    /// Creates a selector over `endpoints` backed by `pool`.
    pub const fn new(pool: Arc<EndpointPool<K>>, endpoints: EndpointList) -> Self {
        Self { pool, endpoints }
    }

    /// The configured endpoint list.
    pub const fn endpoints(&self) -> &EndpointList {
        &self.endpoints
    }

    /// The shared pool.
    pub const fn pool(&self) -> &Arc<EndpointPool<K>> {
        &self.pool
    }

    /// Returns a connection to the first healthy candidate endpoint.
    ///
    /// An `override_endpoint` replaces the configured list with that single endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::NoHealthyEndpoint`] when every candidate fails its probe.
    pub async fn select(
        &self,
        commitment: Commitment,
        purpose: RpcPurpose,
        override_endpoint: Option<&str>,
    ) -> Result<Connection<K::Client>, SelectorError> {
        let mut failures = Vec::new();
        for endpoint in self.endpoints.candidates(override_endpoint) {
            let client = self.pool.get(&endpoint, commitment);
            match self.probe(&endpoint, client.as_ref()).await {
                Ok(()) => {
                    #[cfg(feature = "telemetry")]
                    tracing::info!(
                        endpoint = %endpoint,
                        commitment = %commitment,
                        purpose = %purpose,
                        "[rpc] selected endpoint"
                    );
                    return Ok(Connection::new(endpoint, commitment, client));
                }
                Err(message) => {
                    #[cfg(feature = "telemetry")]
                    tracing::warn!(
                        endpoint = %endpoint,
                        commitment = %commitment,
                        purpose = %purpose,
                        error = %message,
                        "[rpc] endpoint failed"
                    );
                    failures.push(EndpointFailure { endpoint, message });
                }
            }
        }
        Err(SelectorError::NoHealthyEndpoint {
            commitment,
            purpose,
            failures,
        })
    }

    async fn probe(&self, endpoint: &str, client: &K::Client) -> Result<(), String> {
        if !self.pool.needs_probe(endpoint) {
            return Ok(());
        }
        match client.get_epoch().await {
            Ok(_) => {
                self.pool.mark_healthy(endpoint);
                Ok(())
            }
            Err(err) => {
                self.pool.mark_unhealthy(endpoint);
                Err(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnector, MockRpc};
    use std::time::Duration;

    const A: &str = "https://a.example";
    const B: &str = "https://b.example";
    const C: &str = "https://c.example";

    fn selector(connector: &MockConnector, ttl: Duration) -> RpcSelector<MockConnector> {
        let pool = Arc::new(EndpointPool::new(connector.clone(), ttl));
        RpcSelector::new(pool, EndpointList::new(Some(A), [B, C]))
    }

    fn down(url: &str) -> MockRpc {
        MockRpc::new(url).with(|s| s.epoch = Err("connection refused".to_owned()))
    }

    #[tokio::test]
    async fn fails_over_past_unhealthy_endpoints() {
        let connector = MockConnector::default();
        connector.register(down(A));
        let b = connector.register(down(B));
        let c = connector.register(MockRpc::new(C));
        let selector = selector(&connector, Duration::from_secs(45));

        let connection = selector
            .select(Commitment::Confirmed, RpcPurpose::Read, None)
            .await
            .unwrap();

        assert_eq!(connection.endpoint, C);
        assert_eq!(b.state().probes, 1);
        assert_eq!(c.state().probes, 1);
        assert!(selector.pool().needs_probe(A));
        assert!(!selector.pool().needs_probe(C));
    }

    #[tokio::test]
    async fn first_healthy_wins_without_probing_the_rest() {
        let connector = MockConnector::default();
        let a = connector.register(MockRpc::new(A));
        let b = connector.register(MockRpc::new(B));
        let selector = selector(&connector, Duration::from_secs(45));

        let connection = selector
            .select(Commitment::Finalized, RpcPurpose::Send, None)
            .await
            .unwrap();

        assert_eq!(connection.endpoint, A);
        assert_eq!(connection.commitment, Commitment::Finalized);
        assert_eq!(b.state().probes, 0);

        selector
            .select(Commitment::Finalized, RpcPurpose::Send, None)
            .await
            .unwrap();
        assert_eq!(a.state().probes, 1, "fresh health record skips the probe");
    }

    #[tokio::test]
    async fn stale_health_triggers_a_new_probe() {
        let connector = MockConnector::default();
        let a = connector.register(MockRpc::new(A));
        let selector = selector(&connector, Duration::ZERO);

        for _ in 0..3 {
            selector
                .select(Commitment::Confirmed, RpcPurpose::Read, None)
                .await
                .unwrap();
        }
        assert_eq!(a.state().probes, 3);
    }

    #[tokio::test]
    async fn aggregate_error_lists_every_endpoint() {
        let connector = MockConnector::default();
        for url in [A, B, C] {
            connector.register(down(url));
        }
        let selector = selector(&connector, Duration::from_secs(45));

        let err = selector
            .select(Commitment::Processed, RpcPurpose::Send, None)
            .await
            .unwrap_err();

        let SelectorError::NoHealthyEndpoint { failures, .. } = &err;
        assert_eq!(failures.len(), 3);
        let message = err.to_string();
        assert!(message.starts_with(
            "No healthy RPC endpoints available (commitment=processed, purpose=send). Tried: "
        ));
        for url in [A, B, C] {
            assert!(message.contains(url));
        }
    }

    #[tokio::test]
    async fn override_is_the_only_candidate() {
        let connector = MockConnector::default();
        connector.register(down("https://api.devnet.solana.com"));
        let a = connector.register(MockRpc::new(A));
        let selector = selector(&connector, Duration::from_secs(45));

        let err = selector
            .select(
                Commitment::Confirmed,
                RpcPurpose::Read,
                Some("https://api.devnet.solana.com/"),
            )
            .await
            .unwrap_err();

        let SelectorError::NoHealthyEndpoint { failures, .. } = err;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].endpoint, "https://api.devnet.solana.com");
        assert_eq!(a.state().probes, 0);
    }

    #[test]
    fn explorer_url_follows_endpoint_cluster() {
        let connection = Connection::new(
            "https://api.devnet.solana.com",
            Commitment::Confirmed,
            Arc::new(MockRpc::new("https://api.devnet.solana.com")),
        );
        assert_eq!(
            connection.explorer_url("abc"),
            "https://explorer.solana.com/tx/abc?cluster=devnet"
        );
    }
}
