//! One configuration, one endpoint pool, every engine operation.

use std::fmt;
use std::sync::Arc;

use fartnode::{Commitment, RpcPurpose, SolanaCoreConfig};
use solana_instruction::Instruction;
use solana_message::Hash;

use crate::blockhash::{BlockhashWithExpiry, check_blockhash_valid, fetch_fresh_blockhash, within_expiry};
use crate::chain::{Connection, EndpointPool, HttpConnector, RpcConnector, RpcSelector, SelectorError};
use crate::error::CoreError;
use crate::fees::{FeeBounds, PriorityFeeEstimate, PriorityFeeRequest, estimate_priority_fee};
use crate::jito::JitoClient;
use crate::jupiter::JupiterClient;
use crate::memo::identity_memo_instruction;

/// Engine facade bound to a [`SolanaCoreConfig`].
///
/// Cloning is cheap; clones share the endpoint pool and its health records.
pub struct SolanaCore<K: RpcConnector = HttpConnector> {
    config: Arc<SolanaCoreConfig>,
    selector: RpcSelector<K>,
    jupiter: JupiterClient,
    jito: JitoClient,
}

impl<K: RpcConnector> Clone for SolanaCore<K> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            selector: self.selector.clone(),
            jupiter: self.jupiter.clone(),
            jito: self.jito.clone(),
        }
    }
}

impl<K: RpcConnector> fmt::Debug for SolanaCore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaCore")
            .field("config", &self.config)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl SolanaCore<HttpConnector> {
    /// Creates a facade speaking JSON-RPC over HTTP.
    #[must_use]
    pub fn new(config: SolanaCoreConfig) -> Self {
        let connector = HttpConnector::new(config.rpc_timeout);
        Self::with_connector(config, connector)
    }
}

impl<K: RpcConnector> SolanaCore<K> {
    /// Creates a facade whose clients are opened by `connector`.
    #[must_use]
    pub fn with_connector(config: SolanaCoreConfig, connector: K) -> Self {
        let pool = Arc::new(EndpointPool::new(connector, config.health_ttl));
        let selector = RpcSelector::new(pool, config.endpoints.clone());
        Self {
            jupiter: JupiterClient::from_config(&config),
            jito: JitoClient::from_config(&config),
            config: Arc::new(config),
            selector,
        }
    }

    /// The resolved configuration.
    #[must_use]
    pub fn config(&self) -> &SolanaCoreConfig {
        &self.config
    }

    /// The endpoint selector.
    #[must_use]
    pub const fn selector(&self) -> &RpcSelector<K> {
        &self.selector
    }

    /// Selects a healthy endpoint for `purpose` at `commitment`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::NoHealthyEndpoint`] when every candidate fails.
    pub async fn select_endpoint(
        &self,
        commitment: Commitment,
        purpose: RpcPurpose,
        override_endpoint: Option<&str>,
    ) -> Result<Connection<K::Client>, SelectorError> {
        self.selector.select(commitment, purpose, override_endpoint).await
    }

    /// Selects a connection, resolving unset arguments from configuration.
    ///
    /// Without an explicit purpose, an override endpoint implies
    /// [`RpcPurpose::Read`] and the configured list implies [`RpcPurpose::Send`].
    /// Without an explicit commitment, the configured commitment for the purpose applies.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::NoHealthyEndpoint`] when every candidate fails.
    pub async fn connection(
        &self,
        override_endpoint: Option<&str>,
        commitment: Option<Commitment>,
        purpose: Option<RpcPurpose>,
    ) -> Result<Connection<K::Client>, SelectorError> {
        let purpose = purpose.unwrap_or(if override_endpoint.is_some() {
            RpcPurpose::Read
        } else {
            RpcPurpose::Send
        });
        let commitment = self.config.commitment_for(purpose, commitment);
        self.select_endpoint(commitment, purpose, override_endpoint).await
    }

    /// Candidate endpoints, in priority order.
    #[must_use]
    pub fn endpoints(&self, override_endpoint: Option<&str>) -> Vec<String> {
        self.config.endpoints.candidates(override_endpoint)
    }

    /// The highest-priority endpoint, without probing it.
    #[must_use]
    pub fn resolve_endpoint(&self, override_endpoint: Option<&str>) -> String {
        self.config.endpoints.first(override_endpoint)
    }

    /// Fetches a fresh blockhash. Purpose defaults to [`RpcPurpose::Send`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if no endpoint is healthy or the call fails.
    pub async fn fresh_blockhash(
        &self,
        commitment: Option<Commitment>,
        purpose: Option<RpcPurpose>,
    ) -> Result<BlockhashWithExpiry, CoreError> {
        let purpose = purpose.unwrap_or(RpcPurpose::Send);
        let commitment = self.config.commitment_for(purpose, commitment);
        let connection = self.select_endpoint(commitment, purpose, None).await?;
        Ok(fetch_fresh_blockhash(&connection, commitment).await?)
    }

    /// Checks a blockhash against its expiry height.
    ///
    /// No endpoint is selected when the blockhash is unset or the current
    /// height is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the current height must be fetched and cannot be.
    pub async fn is_blockhash_valid(
        &self,
        blockhash: &Hash,
        last_valid_block_height: u64,
        commitment: Option<Commitment>,
        purpose: Option<RpcPurpose>,
        current_block_height: Option<u64>,
    ) -> Result<bool, CoreError> {
        if *blockhash == Hash::default() || last_valid_block_height == 0 {
            return Ok(false);
        }
        if let Some(height) = current_block_height {
            return Ok(within_expiry(height, last_valid_block_height));
        }
        let purpose = purpose.unwrap_or(RpcPurpose::Send);
        let commitment = self.config.commitment_for(purpose, commitment);
        let connection = self.select_endpoint(commitment, purpose, None).await?;
        Ok(check_blockhash_valid(&connection, blockhash, last_valid_block_height, commitment, None).await?)
    }

    /// Estimates a priority fee over a read connection, bounded by configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] if no endpoint is healthy; sampling failures
    /// degrade to the fallback fee instead.
    pub async fn estimate_priority_fee(
        &self,
        request: &PriorityFeeRequest,
    ) -> Result<PriorityFeeEstimate, SelectorError> {
        let commitment = self.config.commitment_for(RpcPurpose::Read, None);
        let connection = self.select_endpoint(commitment, RpcPurpose::Read, None).await?;
        Ok(estimate_priority_fee(&connection, request, FeeBounds::from_config(&self.config)).await)
    }

    /// Identity memo from `override_` or the configured identity.
    #[must_use]
    pub fn identity_memo(&self, override_: Option<&str>) -> Option<Instruction> {
        identity_memo_instruction(override_, &self.config)
    }

    /// The Jupiter client.
    #[must_use]
    pub const fn jupiter(&self) -> &JupiterClient {
        &self.jupiter
    }

    /// The Jito bundle relay.
    #[must_use]
    pub const fn jito(&self) -> &JitoClient {
        &self.jito
    }
}
