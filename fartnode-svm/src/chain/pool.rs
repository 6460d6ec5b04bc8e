use dashmap::DashMap;
use fartnode::Commitment;
use solana_client::nonblocking::rpc_client::RpcClient;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chain::commitment_config;
use crate::chain::rpc::RpcClientLike;

/// Opens RPC clients for endpoints.
pub trait RpcConnector: Send + Sync {
    /// The client type produced by this connector.
    type Client: RpcClientLike + 'static;

    /// Opens a client for `endpoint` with `commitment` as its default commitment.
    fn connect(&self, endpoint: &str, commitment: Commitment) -> Self::Client;
}

/// Connector producing [`RpcClient`] instances over HTTP.
#[derive(Debug, Clone, Copy)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    /// Creates a connector whose clients time out after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl RpcConnector for HttpConnector {
    type Client = RpcClient;

    fn connect(&self, endpoint: &str, commitment: Commitment) -> RpcClient {
        RpcClient::new_with_timeout_and_commitment(
            endpoint.to_owned(),
            self.timeout,
            commitment_config(commitment),
        )
    }
}

/// Process-wide pool of RPC connections and endpoint health records.
///
/// Connections are opened lazily per `(endpoint, commitment)` and kept for the
/// lifetime of the pool. Health is tracked per endpoint as the instant it last
/// answered a liveness probe; a record older than the TTL counts as unknown.
pub struct EndpointPool<K: RpcConnector> {
    connector: K,
    connections: DashMap<(String, Commitment), Arc<K::Client>>,
    health: DashMap<String, Instant>,
    ttl: Duration,
}

impl<K: RpcConnector> fmt::Debug for EndpointPool<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointPool")
            .field("connections", &self.connections.len())
            .field("healthy", &self.health.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<K: RpcConnector> EndpointPool<K> {
    /// Creates an empty pool.
    pub fn new(connector: K, ttl: Duration) -> Self {
        Self {
            connector,
            connections: DashMap::new(),
            health: DashMap::new(),
            ttl,
        }
    }

    /// Returns the cached connection for `(endpoint, commitment)`, opening it on first use.
    pub fn get(&self, endpoint: &str, commitment: Commitment) -> Arc<K::Client> {
        self.connections
            .entry((endpoint.to_owned(), commitment))
            .or_insert_with(|| Arc::new(self.connector.connect(endpoint, commitment)))
            .clone()
    }

    /// Whether `endpoint` must be probed before use.
    pub fn needs_probe(&self, endpoint: &str) -> bool {
        self.health
            .get(endpoint)
            .is_none_or(|checked| checked.elapsed() >= self.ttl)
    }

    /// Records a successful liveness probe.
    pub fn mark_healthy(&self, endpoint: &str) {
        self.health.insert(endpoint.to_owned(), Instant::now());
    }

    /// Clears the health record of `endpoint`.
    pub fn mark_unhealthy(&self, endpoint: &str) {
        self.health.remove(endpoint);
    }

    /// The configured health TTL.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnector;

    #[test]
    fn connections_are_cached_per_endpoint_and_commitment() {
        let connector = MockConnector::default();
        let pool = EndpointPool::new(connector.clone(), Duration::from_secs(45));

        let a = pool.get("https://a.example", Commitment::Confirmed);
        let b = pool.get("https://a.example", Commitment::Confirmed);
        let c = pool.get("https://a.example", Commitment::Finalized);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(connector.opened(), 2);
    }

    #[test]
    fn health_expires_after_ttl() {
        let pool = EndpointPool::new(MockConnector::default(), Duration::ZERO);
        pool.mark_healthy("https://a.example");
        assert!(pool.needs_probe("https://a.example"));

        let pool = EndpointPool::new(MockConnector::default(), Duration::from_secs(45));
        assert!(pool.needs_probe("https://a.example"));
        pool.mark_healthy("https://a.example");
        assert!(!pool.needs_probe("https://a.example"));
        pool.mark_unhealthy("https://a.example");
        assert!(pool.needs_probe("https://a.example"));
    }
}
