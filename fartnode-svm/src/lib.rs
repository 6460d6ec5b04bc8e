#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana RPC resilience and transaction lifecycle engine.
//!
//! This crate takes a transaction from instructions to a confirmed signature
//! against unreliable public RPC infrastructure: it picks a healthy endpoint,
//! prices the transaction, builds and simulates it, and submits it with
//! expiry-aware retries.
//!
//! # Features
//!
//! - **Endpoint Failover**: Priority-ordered endpoints with cached connections and
//!   TTL-bound health records; first healthy endpoint wins
//! - **Blockhash Expiry Tracking**: Fresh blockhashes annotated with their commitment
//!   and endpoint, validated with a safety buffer of two blocks
//! - **Priority Fee Estimation**: Nearest-rank percentiles of recent fees plus a
//!   congestion margin, clamped to configured bounds, with a fallback
//! - **Lookup-Table-Aware Message Building**: Instructions are spliced into existing
//!   v0 transactions without dropping their address lookup tables
//! - **Simulation**: Logs and compute units surfaced on success and failure alike
//! - **Retried Submission**: Bounded retries with linear backoff, blockhash refresh and
//!   mandatory re-signing when the blockhash expires
//! - **Jupiter and Jito**: Swap quotes and transactions, optional bundle submission
//!
//! # Architecture
//!
//! - [`chain`] - RPC client seam, endpoint pool and selector
//! - [`blockhash`] - Blockhash fetching and expiry checks
//! - [`fees`] - Priority fee estimation
//! - [`compute`] - Compute-budget instructions
//! - [`memo`] - Memo and identity memo instructions
//! - [`message`] - Message compilation, splicing and wire encoding
//! - [`simulate`] - Simulate-before-send
//! - [`send`] - Submission with retries and confirmation
//! - [`jupiter`] - Jupiter swap API client
//! - [`jito`] - Jito bundle relay
//! - [`SolanaCore`] - Facade binding all of the above to one [`SolanaCoreConfig`]
//!
//! # Feature Flags
//!
//! - `telemetry` - Tracing instrumentation
//! - `test_utils` - In-memory RPC doubles in [`testing`]
//!
//! # Usage
//!
//! ```ignore
//! use fartnode::SolanaCoreConfig;
//! use fartnode_svm::{SolanaCore, fees::PriorityFeeRequest};
//!
//! let core = SolanaCore::new(SolanaCoreConfig::from_env()?);
//! let fee = core
//!     .estimate_priority_fee(&PriorityFeeRequest::for_accounts([payer.to_string()]))
//!     .await?;
//! let fresh = core.fresh_blockhash(None, None).await?;
//! let tx = build_versioned_transaction(&payer, &instructions, fresh.blockhash, &[])?;
//! ```
//!
//! [`SolanaCoreConfig`]: fartnode::SolanaCoreConfig

pub mod blockhash;
pub mod chain;
pub mod compute;
pub mod fees;
pub mod jito;
pub mod jupiter;
pub mod memo;
pub mod message;
pub mod send;
pub mod simulate;

mod error;
mod facade;

#[cfg(any(test, feature = "test_utils"))]
pub mod testing;

pub use blockhash::{BlockhashWithExpiry, check_blockhash_valid, fetch_fresh_blockhash};
pub use chain::{Connection, EndpointPool, HttpConnector, RpcClientLike, RpcConnector, RpcSelector, SelectorError};
pub use error::CoreError;
pub use facade::SolanaCore;
pub use fees::{PriorityFeeEstimate, PriorityFeeRequest, estimate_priority_fee};
pub use jito::{JitoClient, JitoError};
pub use jupiter::{JupiterClient, JupiterError};
pub use message::{MessageError, build_versioned_transaction};
pub use send::{SendError, SendWithRetryOptions, SendWithRetryResult, send_with_retry};
pub use simulate::{SimulateError, SimulationError, SimulationReport, simulate_and_report};
