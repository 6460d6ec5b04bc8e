use serde_json::Value;
use solana_account::Account;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_client::rpc_response::RpcPrioritizationFee;
use solana_commitment_config::CommitmentConfig;
use solana_message::Hash;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use std::future::Future;
use std::sync::Arc;

/// Result of a `simulateTransaction` call, reduced to the fields the engine reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResponse {
    /// The error reported by the node, as raw JSON. `None` means the simulation succeeded.
    pub err: Option<Value>,
    /// Program logs, when the node returned them.
    pub logs: Option<Vec<String>>,
    /// Compute units consumed by the simulated transaction.
    pub units_consumed: Option<u64>,
}

/// Status of a submitted signature at the requested commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Not yet visible at the requested commitment.
    Pending,
    /// Landed without error.
    Confirmed,
    /// Landed with an on-chain error.
    Failed(String),
}

/// Trait for RPC client operations needed by the transaction lifecycle.
///
/// This allows using mocks in tests while the production path goes through
/// [`RpcClient`].
pub trait RpcClientLike: Send + Sync {
    /// The URL this client talks to.
    fn url(&self) -> String;

    /// Cheap liveness probe. Returns the current epoch.
    fn get_epoch(&self) -> impl Future<Output = Result<u64, ClientError>> + Send;

    /// Latest blockhash together with its last valid block height.
    fn get_latest_blockhash_with_commitment(
        &self,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<(Hash, u64), ClientError>> + Send;

    /// Current block height.
    fn get_block_height_with_commitment(
        &self,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send;

    /// Recent prioritization fees for the given writable accounts.
    fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> impl Future<Output = Result<Vec<RpcPrioritizationFee>, ClientError>> + Send;

    /// Fetches an account.
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Account, ClientError>> + Send;

    /// Simulates a transaction.
    fn simulate_transaction_with_config(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSimulateTransactionConfig,
    ) -> impl Future<Output = Result<SimulationResponse, ClientError>> + Send;

    /// Submits a transaction and returns its signature.
    fn send_transaction_with_config(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSendTransactionConfig,
    ) -> impl Future<Output = Result<Signature, ClientError>> + Send;

    /// Looks up a signature status.
    fn get_signature_status_with_commitment(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<SignatureStatus, ClientError>> + Send;

    /// Requests an airdrop of `lamports` to `pubkey`.
    fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
    ) -> impl Future<Output = Result<Signature, ClientError>> + Send;
}

impl RpcClientLike for RpcClient {
    fn url(&self) -> String {
        Self::url(self)
    }

    async fn get_epoch(&self) -> Result<u64, ClientError> {
        Ok(self.get_epoch_info().await?.epoch)
    }

    async fn get_latest_blockhash_with_commitment(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<(Hash, u64), ClientError> {
        Self::get_latest_blockhash_with_commitment(self, commitment).await
    }

    async fn get_block_height_with_commitment(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<u64, ClientError> {
        Self::get_block_height_with_commitment(self, commitment).await
    }

    async fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<RpcPrioritizationFee>, ClientError> {
        Self::get_recent_prioritization_fees(self, addresses).await
    }

    async fn get_account(&self, pubkey: &Pubkey) -> Result<Account, ClientError> {
        Self::get_account(self, pubkey).await
    }

    async fn simulate_transaction_with_config(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSimulateTransactionConfig,
    ) -> Result<SimulationResponse, ClientError> {
        let result = Self::simulate_transaction_with_config(self, transaction, config)
            .await?
            .value;
        let err = result.err.map(|err| {
            serde_json::to_value(&err).unwrap_or_else(|_| Value::String(format!("{err:?}")))
        });
        Ok(SimulationResponse {
            err,
            logs: result.logs,
            units_consumed: result.units_consumed,
        })
    }

    async fn send_transaction_with_config(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSendTransactionConfig,
    ) -> Result<Signature, ClientError> {
        Self::send_transaction_with_config(self, transaction, config).await
    }

    async fn get_signature_status_with_commitment(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureStatus, ClientError> {
        let status =
            Self::get_signature_status_with_commitment(self, signature, commitment).await?;
        Ok(match status {
            None => SignatureStatus::Pending,
            Some(Ok(())) => SignatureStatus::Confirmed,
            Some(Err(err)) => SignatureStatus::Failed(err.to_string()),
        })
    }

    async fn request_airdrop(&self, pubkey: &Pubkey, lamports: u64) -> Result<Signature, ClientError> {
        Self::request_airdrop(self, pubkey, lamports).await
    }
}

impl<T: RpcClientLike> RpcClientLike for Arc<T> {
    fn url(&self) -> String {
        (**self).url()
    }

    fn get_epoch(&self) -> impl Future<Output = Result<u64, ClientError>> + Send {
        (**self).get_epoch()
    }

    fn get_latest_blockhash_with_commitment(
        &self,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<(Hash, u64), ClientError>> + Send {
        (**self).get_latest_blockhash_with_commitment(commitment)
    }

    fn get_block_height_with_commitment(
        &self,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<u64, ClientError>> + Send {
        (**self).get_block_height_with_commitment(commitment)
    }

    fn get_recent_prioritization_fees(
        &self,
        addresses: &[Pubkey],
    ) -> impl Future<Output = Result<Vec<RpcPrioritizationFee>, ClientError>> + Send {
        (**self).get_recent_prioritization_fees(addresses)
    }

    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Account, ClientError>> + Send {
        (**self).get_account(pubkey)
    }

    fn simulate_transaction_with_config(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSimulateTransactionConfig,
    ) -> impl Future<Output = Result<SimulationResponse, ClientError>> + Send {
        (**self).simulate_transaction_with_config(transaction, config)
    }

    fn send_transaction_with_config(
        &self,
        transaction: &VersionedTransaction,
        config: RpcSendTransactionConfig,
    ) -> impl Future<Output = Result<Signature, ClientError>> + Send {
        (**self).send_transaction_with_config(transaction, config)
    }

    fn get_signature_status_with_commitment(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<SignatureStatus, ClientError>> + Send {
        (**self).get_signature_status_with_commitment(signature, commitment)
    }

    fn request_airdrop(
        &self,
        pubkey: &Pubkey,
        lamports: u64,
    ) -> impl Future<Output = Result<Signature, ClientError>> + Send {
        (**self).request_airdrop(pubkey, lamports)
    }
}
