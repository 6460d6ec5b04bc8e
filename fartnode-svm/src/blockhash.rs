//! Blockhash freshness: fetching a blockhash with its expiry height and
//! checking whether a previously fetched one is still usable.

use fartnode::Commitment;
use solana_client::client_error::ClientError;
use solana_message::Hash;

use crate::chain::{Connection, RpcClientLike, commitment_config};

/// Blocks of headroom required between the current height and the expiry height.
///
/// Height can advance between the check and the actual submission.
pub const BLOCK_HEIGHT_SAFETY_BUFFER: u64 = 2;

/// A blockhash annotated with the context it was fetched in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockhashWithExpiry {
    /// The recent blockhash.
    pub blockhash: Hash,
    /// Last block height at which a transaction referencing `blockhash` is accepted.
    pub last_valid_block_height: u64,
    /// Commitment the blockhash was read at.
    pub commitment: Commitment,
    /// Endpoint that served it.
    pub endpoint: String,
}

/// Whether `current_block_height` leaves enough headroom before `last_valid_block_height`.
#[must_use]
pub const fn within_expiry(current_block_height: u64, last_valid_block_height: u64) -> bool {
    match last_valid_block_height.checked_sub(BLOCK_HEIGHT_SAFETY_BUFFER) {
        Some(limit) => current_block_height <= limit,
        None => false,
    }
}

/// Fetches the latest blockhash at `commitment`.
///
/// # Errors
///
/// Returns [`ClientError`] if the RPC call fails.
pub async fn fetch_fresh_blockhash<C: RpcClientLike>(
    connection: &Connection<C>,
    commitment: Commitment,
) -> Result<BlockhashWithExpiry, ClientError> {
    let (blockhash, last_valid_block_height) = connection
        .client
        .get_latest_blockhash_with_commitment(commitment_config(commitment))
        .await?;
    #[cfg(feature = "telemetry")]
    tracing::info!(
        blockhash = %blockhash,
        last_valid_block_height,
        commitment = %commitment,
        endpoint = %connection.endpoint,
        "[blockhash] fetched"
    );
    Ok(BlockhashWithExpiry {
        blockhash,
        last_valid_block_height,
        commitment,
        endpoint: connection.endpoint.clone(),
    })
}

/// Checks whether `blockhash` is still usable.
///
/// An unset blockhash or a zero expiry height is invalid without any RPC call.
/// The current block height is fetched from `connection` unless supplied.
///
/// # Errors
///
/// Returns [`ClientError`] if the block height cannot be fetched.
pub async fn check_blockhash_valid<C: RpcClientLike>(
    connection: &Connection<C>,
    blockhash: &Hash,
    last_valid_block_height: u64,
    commitment: Commitment,
    current_block_height: Option<u64>,
) -> Result<bool, ClientError> {
    if *blockhash == Hash::default() || last_valid_block_height == 0 {
        return Ok(false);
    }
    let block_height = match current_block_height {
        Some(height) => height,
        None => {
            connection
                .client
                .get_block_height_with_commitment(commitment_config(commitment))
                .await?
        }
    };
    let valid = within_expiry(block_height, last_valid_block_height);
    #[cfg(feature = "telemetry")]
    tracing::debug!(
        blockhash = %blockhash,
        last_valid_block_height,
        block_height,
        buffer = BLOCK_HEIGHT_SAFETY_BUFFER,
        valid,
        "[blockhash] validation"
    );
    Ok(valid)
}
