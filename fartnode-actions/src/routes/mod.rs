//! Axum routes of the actions server.
//!
//! Endpoints:
//! - `GET /health` - liveness
//! - `GET /actions.json` - Blink path rules
//! - `GET|POST /api/actions/transfer-sol` - SOL transfer
//! - `GET|POST /api/actions/swap` - Jupiter swap
//! - `GET|POST /api/solana/devnet-airdrop` - devnet airdrop and placeholder transaction

use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, header};
use axum::routing::get;
use axum::{Json, Router};
use fartnode_svm::{HttpConnector, RpcConnector, SolanaCore};
use serde::Serialize;
use solana_pubkey::Pubkey;

use crate::blink::{ActionsJson, render_blink_url};
use crate::config::ActionsConfig;
use crate::error::ActionError;

pub mod airdrop;
pub mod swap;
pub mod transfer;

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Shared state of every route.
pub struct ActionsState<K: RpcConnector = HttpConnector> {
    /// The engine.
    pub core: SolanaCore<K>,
    /// Server configuration.
    pub config: ActionsConfig,
}

impl<K: RpcConnector> fmt::Debug for ActionsState<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionsState")
            .field("core", &self.core)
            .field("config", &self.config)
            .finish()
    }
}

impl<K: RpcConnector> ActionsState<K> {
    /// Wraps the engine and server configuration.
    #[must_use]
    pub const fn new(core: SolanaCore<K>, config: ActionsConfig) -> Self {
        Self { core, config }
    }

    /// Origin for absolute links: the configured public origin, else the
    /// request's `Host` (and `X-Forwarded-Proto`), else localhost.
    #[must_use]
    pub fn origin(&self, headers: &HeaderMap) -> String {
        if let Some(origin) = self.config.origin() {
            return origin;
        }
        let proto = headers
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("http");
        let host = headers.get(header::HOST).and_then(|value| value.to_str().ok());
        host.map_or_else(
            || format!("http://localhost:{}", self.config.port),
            |host| format!("{proto}://{host}"),
        )
    }
}

/// Builds the router with every action endpoint.
pub fn actions_router<K>(state: Arc<ActionsState<K>>) -> Router
where
    K: RpcConnector + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/actions.json", get(actions_json))
        .route(
            transfer::ACTION_PATH,
            get(transfer::get_metadata::<K>).post(transfer::post_compose::<K>),
        )
        .route(
            swap::ACTION_PATH,
            get(swap::get_metadata::<K>).post(swap::post_compose::<K>),
        )
        .route(
            airdrop::ACTION_PATH,
            get(airdrop::get_metadata).post(airdrop::post_compose::<K>),
        )
        .with_state(state)
}

/// `GET /health`
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /actions.json`
async fn actions_json() -> Json<ActionsJson> {
    Json(ActionsJson::default())
}

/// Diagnostics attached to composed transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeMeta {
    /// `devnet`, `testnet` or `mainnet`.
    pub network: &'static str,
    /// Endpoint the transaction was composed against.
    pub rpc_endpoint: String,
    /// Compute-unit price used.
    pub priority_fee_microlamports: u64,
    /// Blockhash the transaction references.
    pub blockhash: String,
    /// Last block height at which the blockhash is valid.
    pub last_valid_block_height: u64,
    /// Blink URL of the action.
    pub blink_url: String,
    /// Explorer URL template with a `<signature>` placeholder.
    pub explorer_hint: String,
    /// Simulation logs.
    pub logs: Vec<String>,
}

/// Parses a required base58 public key field.
pub(crate) fn parse_pubkey(value: Option<&str>, field: &str) -> Result<Pubkey, ActionError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ActionError::invalid(format!("{field} is required")))?;
    value
        .parse()
        .map_err(|_| ActionError::invalid(format!("{field} is not a valid Solana public key")))
}

/// SOL to lamports, rounded to the nearest lamport.
pub(crate) fn sol_to_lamports(amount_sol: f64) -> Result<u64, ActionError> {
    let lamports = (amount_sol * 1e9).round();
    if !lamports.is_finite() || lamports < 1.0 || lamports > u64::MAX as f64 {
        return Err(ActionError::invalid("amountSol must be a positive number"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(lamports as u64)
}

/// Blink URL for an action served at `action_path` and shown at `blink_path`.
pub(crate) fn blink_url(
    origin: &str,
    blink_path: &str,
    action_path: &str,
    label: &str,
    message: &str,
) -> Result<String, ActionError> {
    render_blink_url(
        &format!("{origin}{blink_path}"),
        &format!("{origin}{action_path}"),
        Some(label),
        Some(message),
    )
    .map_err(|err| ActionError::Internal(format!("invalid blink URL: {err}")))
}
