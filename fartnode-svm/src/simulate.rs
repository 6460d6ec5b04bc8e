//! Simulate-before-send.
//!
//! Two blockhash modes:
//! [`SimulationMode::PreserveBlockhash`] dry-runs exactly what will be signed,
//! while [`SimulationMode::ReplaceBlockhash`] lets the node substitute a fresh
//! blockhash for quick previews of transactions that may already be stale.

use fartnode::Commitment;
use serde::Serialize;
use serde_json::Value;
use solana_client::client_error::ClientError;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_transaction::versioned::VersionedTransaction;

use crate::chain::{Connection, RpcClientLike, commitment_config};

/// How the recent blockhash is treated during simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimulationMode {
    /// Simulate against the transaction's own blockhash.
    #[default]
    PreserveBlockhash,
    /// Let the node replace the blockhash with its latest one.
    ReplaceBlockhash,
}

/// Options of a single simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationOptions {
    /// Commitment to simulate at; the connection's commitment when unset.
    pub commitment: Option<Commitment>,
    /// Verify signatures. Ignored in [`SimulationMode::ReplaceBlockhash`],
    /// which nodes refuse to combine with verification.
    pub enable_signature_verification: bool,
    /// Blockhash handling.
    pub mode: SimulationMode,
}

impl SimulationOptions {
    /// Quick-preview defaults: no signature verification, blockhash replaced.
    #[must_use]
    pub const fn preview() -> Self {
        Self {
            commitment: None,
            enable_signature_verification: false,
            mode: SimulationMode::ReplaceBlockhash,
        }
    }

    /// Sets the commitment.
    #[must_use]
    pub const fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = Some(commitment);
        self
    }

    fn rpc_config(self, fallback: Commitment) -> RpcSimulateTransactionConfig {
        let replace_recent_blockhash = self.mode == SimulationMode::ReplaceBlockhash;
        RpcSimulateTransactionConfig {
            sig_verify: self.enable_signature_verification && !replace_recent_blockhash,
            replace_recent_blockhash,
            commitment: Some(commitment_config(self.commitment.unwrap_or(fallback))),
            ..RpcSimulateTransactionConfig::default()
        }
    }
}

/// Outcome of a successful simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Program logs, possibly empty.
    pub logs: Vec<String>,
    /// Always `None` for a returned report.
    pub err: Option<Value>,
    /// Compute units consumed, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units_consumed: Option<u64>,
}

/// The simulated execution reported an error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct SimulationError {
    /// Human-readable summary.
    pub message: String,
    /// Program logs up to the failure.
    pub logs: Vec<String>,
    /// Compute units consumed, when reported.
    pub units_consumed: Option<u64>,
    /// The chain error exactly as the node returned it.
    pub original_error: Value,
}

impl SimulationError {
    fn new(original_error: Value, logs: Vec<String>, units_consumed: Option<u64>) -> Self {
        Self {
            message: "Simulation returned a non-null error".to_owned(),
            logs,
            units_consumed,
            original_error,
        }
    }
}

/// Errors raised by [`simulate_and_report`].
#[derive(Debug, thiserror::Error)]
pub enum SimulateError {
    /// The simulation ran and the transaction failed.
    #[error(transparent)]
    Failed(#[from] SimulationError),
    /// The RPC call itself failed.
    #[error("simulation request failed: {0}")]
    Rpc(#[from] ClientError),
}

/// Simulates `transaction` and reports logs and compute usage.
///
/// # Errors
///
/// Returns [`SimulateError::Failed`] when the node reports a non-null error and
/// [`SimulateError::Rpc`] when the call itself fails.
pub async fn simulate_and_report<C: RpcClientLike>(
    connection: &Connection<C>,
    transaction: &VersionedTransaction,
    options: SimulationOptions,
) -> Result<SimulationReport, SimulateError> {
    let response = connection
        .client
        .simulate_transaction_with_config(transaction, options.rpc_config(connection.commitment))
        .await?;
    let logs = response.logs.unwrap_or_default();
    match response.err {
        Some(err) if !err.is_null() => {
            #[cfg(feature = "telemetry")]
            tracing::warn!(
                endpoint = %connection.endpoint,
                error = %err,
                "[simulate] simulation returned an error"
            );
            Err(SimulationError::new(err, logs, response.units_consumed).into())
        }
        _ => Ok(SimulationReport {
            logs,
            err: None,
            units_consumed: response.units_consumed,
        }),
    }
}

/// [`simulate_and_report`] with [`SimulationOptions::preview`] defaults.
///
/// # Errors
///
/// Same as [`simulate_and_report`].
pub async fn simulate_first<C: RpcClientLike>(
    connection: &Connection<C>,
    transaction: &VersionedTransaction,
    commitment: Option<Commitment>,
) -> Result<SimulationReport, SimulateError> {
    let options = SimulationOptions {
        commitment,
        ..SimulationOptions::preview()
    };
    simulate_and_report(connection, transaction, options).await
}
