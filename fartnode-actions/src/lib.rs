//! Solana Actions ("Blinks") server built on the fartnode engine.
//!
//! Composes unsigned, simulated transactions for wallets to sign:
//!
//! - SOL transfers with compute-budget, priority-fee and memo instructions
//! - Jupiter swaps re-targeted at a fresh blockhash
//! - Devnet airdrops with a placeholder transaction
//!
//! # Modules
//!
//! - [`routes`] - Axum handlers and router builder
//! - [`blink`] - Action response types and Blink URL rendering
//! - [`error`] - Error type mapped to HTTP responses
//! - [`config`] - Server configuration with environment variable expansion
//! - [`util`] - Shutdown signal handling

pub mod blink;
pub mod config;
pub mod error;
pub mod routes;
pub mod util;

pub use config::ActionsConfig;
pub use error::ActionError;
pub use routes::{ActionsState, actions_router};
