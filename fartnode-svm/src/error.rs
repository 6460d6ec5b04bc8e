//! Errors of the [`SolanaCore`](crate::SolanaCore) facade.

use solana_client::client_error::ClientError;

use crate::chain::SelectorError;

/// Errors raised by facade operations that select an endpoint and then call it.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No endpoint passed its liveness probe.
    #[error(transparent)]
    Selector(#[from] SelectorError),
    /// The selected endpoint failed the call.
    #[error("RPC call failed: {0}")]
    Rpc(#[from] ClientError),
}
