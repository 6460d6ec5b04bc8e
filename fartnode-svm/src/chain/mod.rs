//! RPC plumbing: the client seam, the endpoint pool and the selector.
//!
//! # Key Types
//!
//! - [`RpcClientLike`] - The subset of the Solana JSON-RPC API the engine uses
//! - [`EndpointPool`] - Cached connections per `(endpoint, commitment)` plus health records
//! - [`RpcSelector`] - First-healthy-wins failover over a prioritized endpoint list
//! - [`Connection`] - A live client bound to the endpoint and commitment it was opened with
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fartnode::{Commitment, RpcPurpose, SolanaCoreConfig};
//! use fartnode_svm::chain::{EndpointPool, HttpConnector, RpcSelector};
//!
//! let config = SolanaCoreConfig::from_env()?;
//! let pool = Arc::new(EndpointPool::new(HttpConnector::new(config.rpc_timeout), config.health_ttl));
//! let selector = RpcSelector::new(pool, config.endpoints.clone());
//! let connection = selector.select(Commitment::Confirmed, RpcPurpose::Read, None).await?;
//! ```

use fartnode::Commitment;
use solana_commitment_config::CommitmentConfig;

pub use solana_client::client_error::ClientError;

/// Endpoint pool and connectors.
pub mod pool;
pub use pool::*;

/// RPC client abstraction for Solana.
pub mod rpc;
pub use rpc::*;

/// Endpoint selection with health-checked failover.
pub mod selector;
pub use selector::*;

/// Converts a commitment level into the SDK configuration type.
#[must_use]
pub const fn commitment_config(commitment: Commitment) -> CommitmentConfig {
    match commitment {
        Commitment::Processed => CommitmentConfig::processed(),
        Commitment::Confirmed => CommitmentConfig::confirmed(),
        Commitment::Finalized => CommitmentConfig::finalized(),
    }
}
