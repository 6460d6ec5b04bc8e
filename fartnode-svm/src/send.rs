//! Expiry-aware submission with bounded retries.
//!
//! Each attempt is one pass of: validate blockhash, refresh and re-sign if it
//! expired, send with RPC-level retries disabled, then poll for confirmation.
//! The attempt resolves to an [`AttemptOutcome`]; the outer loop retries
//! [`AttemptOutcome::Retryable`] outcomes with linear backoff until the retry
//! budget is spent.

use fartnode::Commitment;
use solana_client::client_error::ClientError;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_message::Hash;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::blockhash::{BlockhashWithExpiry, check_blockhash_valid, fetch_fresh_blockhash};
use crate::chain::{Connection, RpcClientLike, SignatureStatus, commitment_config};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Backoff step per retry.
pub const BACKOFF_STEP: Duration = Duration::from_millis(500);
/// Backoff ceiling.
pub const MAX_BACKOFF: Duration = Duration::from_millis(2_000);
/// Default interval between signature status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Boxed error returned by caller-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by a [`ResignFn`].
pub type ResignFuture = Pin<Box<dyn Future<Output = Result<VersionedTransaction, BoxError>> + Send>>;
/// Rebuilds and re-signs the transaction for a new `(blockhash, last_valid_block_height)`.
pub type ResignFn = Box<dyn Fn(Hash, u64) -> ResignFuture + Send + Sync>;

/// Future returned by a [`RefreshFn`].
pub type RefreshFuture = Pin<Box<dyn Future<Output = Result<BlockhashWithExpiry, BoxError>> + Send>>;
/// Produces a fresh blockhash when the current one expired.
pub type RefreshFn = Box<dyn Fn() -> RefreshFuture + Send + Sync>;

/// Linear backoff: `min(500ms * retries, 2000ms)`.
#[must_use]
pub fn backoff(retries: u32) -> Duration {
    BACKOFF_STEP.saturating_mul(retries).min(MAX_BACKOFF)
}

/// Options of [`send_with_retry`].
pub struct SendWithRetryOptions {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Target commitment; the connection's commitment when unset.
    pub commitment: Option<Commitment>,
    /// Expiry height of the transaction's blockhash. Must be positive.
    pub last_valid_block_height: u64,
    /// Re-signing callback, required to recover from expiry.
    pub resign: Option<ResignFn>,
    /// Blockhash source used on expiry; fetches from the connection when unset.
    pub refresh_blockhash: Option<RefreshFn>,
    /// Interval between confirmation polls.
    pub poll_interval: Duration,
}

impl fmt::Debug for SendWithRetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendWithRetryOptions")
            .field("max_retries", &self.max_retries)
            .field("commitment", &self.commitment)
            .field("last_valid_block_height", &self.last_valid_block_height)
            .field("resign", &self.resign.is_some())
            .field("refresh_blockhash", &self.refresh_blockhash.is_some())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl SendWithRetryOptions {
    /// Options for a transaction whose blockhash expires after `last_valid_block_height`.
    #[must_use]
    pub const fn new(last_valid_block_height: u64) -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            commitment: None,
            last_valid_block_height,
            resign: None,
            refresh_blockhash: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the target commitment.
    #[must_use]
    pub const fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = Some(commitment);
        self
    }

    /// Sets the confirmation poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the re-signing callback.
    #[must_use]
    pub fn with_resign<F, Fut, E>(mut self, resign: F) -> Self
    where
        F: Fn(Hash, u64) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<VersionedTransaction, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.resign = Some(Box::new(move |blockhash, last_valid_block_height| {
            let fut = resign(blockhash, last_valid_block_height);
            Box::pin(async move { fut.await.map_err(Into::into) })
        }));
        self
    }

    /// Sets the blockhash source used on expiry.
    #[must_use]
    pub fn with_refresh<F, Fut, E>(mut self, refresh: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BlockhashWithExpiry, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.refresh_blockhash = Some(Box::new(move || {
            let fut = refresh();
            Box::pin(async move { fut.await.map_err(Into::into) })
        }));
        self
    }
}

/// A confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendWithRetryResult {
    /// Transaction signature.
    pub signature: Signature,
    /// Explorer link on the endpoint's cluster.
    pub explorer_url: String,
    /// Retries actually used.
    pub retries: u32,
}

/// Errors raised by [`send_with_retry`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// No expiry height was supplied.
    #[error("lastValidBlockHeight is required for sendWithRetry")]
    MissingLastValidBlockHeight,
    /// The blockhash expired and no re-signing callback was supplied.
    #[error("Blockhash expired but no resign function provided.")]
    MissingResign,
    /// Fetching a replacement blockhash failed.
    #[error("blockhash refresh failed: {0}")]
    Refresh(#[source] BoxError),
    /// The re-signing callback failed.
    #[error("resign failed: {0}")]
    Resign(#[source] BoxError),
    /// The blockhash validity check could not be performed.
    #[error("blockhash validity check failed: {0}")]
    BlockhashCheck(#[source] ClientError),
    /// Submission or confirmation polling failed at the RPC layer.
    #[error("transaction submission failed: {0}")]
    Submit(#[source] ClientError),
    /// The transaction landed with an on-chain error.
    #[error("transaction {signature} failed: {reason}")]
    Failed {
        /// The signature.
        signature: Signature,
        /// The chain error.
        reason: String,
    },
    /// The blockhash expired before the transaction was confirmed.
    #[error("block height exceeded before transaction {signature} was confirmed")]
    Expired {
        /// The signature.
        signature: Signature,
    },
}

/// Result of one send attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Confirmed at the target commitment.
    Success(Signature),
    /// Failed in a way another attempt may fix.
    Retryable(SendError),
    /// Failed in a way no retry can fix.
    Fatal(SendError),
}

struct Attempt<'a, C> {
    connection: &'a Connection<C>,
    commitment: Commitment,
    options: &'a SendWithRetryOptions,
}

impl<C: RpcClientLike> Attempt<'_, C> {
    async fn run(
        &self,
        transaction: &mut VersionedTransaction,
        blockhash: &mut BlockhashWithExpiry,
    ) -> AttemptOutcome {
        let valid = match check_blockhash_valid(
            self.connection,
            &blockhash.blockhash,
            blockhash.last_valid_block_height,
            self.commitment,
            None,
        )
        .await
        {
            Ok(valid) => valid,
            Err(e) => return AttemptOutcome::Fatal(SendError::BlockhashCheck(e)),
        };
        if !valid {
            #[cfg(feature = "telemetry")]
            tracing::warn!(
                endpoint = %self.connection.endpoint,
                last_valid_block_height = blockhash.last_valid_block_height,
                "[send] blockhash expired prior to send, refreshing"
            );
            if let Err(e) = self.refresh(transaction, blockhash).await {
                return AttemptOutcome::Fatal(e);
            }
        }

        let config = RpcSendTransactionConfig {
            preflight_commitment: Some(commitment_config(self.commitment).commitment),
            max_retries: Some(0),
            ..RpcSendTransactionConfig::default()
        };
        let signature = match self
            .connection
            .client
            .send_transaction_with_config(transaction, config)
            .await
        {
            Ok(signature) => signature,
            Err(e) => return AttemptOutcome::Retryable(SendError::Submit(e)),
        };

        match self.confirm(&signature, blockhash.last_valid_block_height).await {
            Ok(()) => AttemptOutcome::Success(signature),
            Err(e @ SendError::Failed { .. }) => AttemptOutcome::Fatal(e),
            Err(e) => AttemptOutcome::Retryable(e),
        }
    }

    async fn refresh(
        &self,
        transaction: &mut VersionedTransaction,
        blockhash: &mut BlockhashWithExpiry,
    ) -> Result<(), SendError> {
        let next = match &self.options.refresh_blockhash {
            Some(refresh) => refresh().await.map_err(SendError::Refresh)?,
            None => fetch_fresh_blockhash(self.connection, self.commitment)
                .await
                .map_err(|e| SendError::Refresh(Box::new(e)))?,
        };
        let resign = self.options.resign.as_ref().ok_or(SendError::MissingResign)?;
        *transaction = resign(next.blockhash, next.last_valid_block_height)
            .await
            .map_err(SendError::Resign)?;
        *blockhash = next;
        Ok(())
    }

    async fn confirm(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), SendError> {
        let config = commitment_config(self.commitment);
        loop {
            let status = self
                .connection
                .client
                .get_signature_status_with_commitment(signature, config)
                .await
                .map_err(SendError::Submit)?;
            match status {
                SignatureStatus::Confirmed => return Ok(()),
                SignatureStatus::Failed(reason) => {
                    return Err(SendError::Failed {
                        signature: *signature,
                        reason,
                    });
                }
                SignatureStatus::Pending => {}
            }
            let height = self
                .connection
                .client
                .get_block_height_with_commitment(config)
                .await
                .map_err(SendError::Submit)?;
            if height > last_valid_block_height {
                return Err(SendError::Expired {
                    signature: *signature,
                });
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }
}

/// Sends `transaction` and waits for confirmation, retrying with backoff.
///
/// Before every attempt the blockhash is validated; an expired blockhash is
/// replaced through the refresh callback and the transaction rebuilt through
/// the resign callback. Exhausting the retry budget returns the last error.
///
/// # Errors
///
/// Returns [`SendError::MissingLastValidBlockHeight`] immediately when no
/// expiry height is set, a fatal [`SendError`] as soon as one occurs, or the
/// last retryable [`SendError`] once the retry budget is spent.
pub async fn send_with_retry<C: RpcClientLike>(
    connection: &Connection<C>,
    transaction: VersionedTransaction,
    options: SendWithRetryOptions,
) -> Result<SendWithRetryResult, SendError> {
    if options.last_valid_block_height == 0 {
        return Err(SendError::MissingLastValidBlockHeight);
    }
    let commitment = options.commitment.unwrap_or(connection.commitment);
    let mut transaction = transaction;
    let mut blockhash = BlockhashWithExpiry {
        blockhash: *transaction.message.recent_blockhash(),
        last_valid_block_height: options.last_valid_block_height,
        commitment,
        endpoint: connection.endpoint.clone(),
    };
    let attempt = Attempt {
        connection,
        commitment,
        options: &options,
    };

    let mut retries = 0;
    loop {
        match attempt.run(&mut transaction, &mut blockhash).await {
            AttemptOutcome::Success(signature) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(
                    signature = %signature,
                    endpoint = %connection.endpoint,
                    commitment = %commitment,
                    retries,
                    "[send] transaction confirmed"
                );
                return Ok(SendWithRetryResult {
                    explorer_url: connection.explorer_url(&signature.to_string()),
                    signature,
                    retries,
                });
            }
            AttemptOutcome::Fatal(e) => return Err(e),
            AttemptOutcome::Retryable(e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(
                    endpoint = %connection.endpoint,
                    retries,
                    max_retries = options.max_retries,
                    error = %e,
                    "[send] attempt failed"
                );
                if retries >= options.max_retries {
                    return Err(e);
                }
                retries += 1;
                tokio::time::sleep(backoff(retries)).await;
            }
        }
    }
}
