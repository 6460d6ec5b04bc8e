//! `GET|POST /api/actions/transfer-sol`

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use fartnode::RpcPurpose;
use fartnode_svm::compute::{DEFAULT_COMPUTE_UNIT_LIMIT, compute_budget_instructions};
use fartnode_svm::memo::user_memo_instruction;
use fartnode_svm::message::serialize_transaction_base64;
use fartnode_svm::simulate::SimulationOptions;
use fartnode_svm::{
    PriorityFeeRequest, RpcConnector, SolanaCore, build_versioned_transaction, fetch_fresh_blockhash,
    simulate_and_report,
};
use serde::{Deserialize, Serialize};

use super::{ActionsState, ComposeMeta, blink_url, parse_pubkey, sol_to_lamports};
use crate::blink::{
    ActionGetResponse, ActionMetadata, ActionParameter, ActionPostResponse, LinkedAction, ParameterType,
};
use crate::error::ActionError;

/// Action API path.
pub const ACTION_PATH: &str = "/api/actions/transfer-sol";
/// Blink path.
pub const BLINK_PATH: &str = "/actions/transfer-sol";

const LABEL: &str = "Transfer SOL";
const ICON_URL: &str = "https://solana.com/favicon.ico";
const BLINK_MESSAGE: &str = "Transfer SOL with institutional safeguards.";

/// Body of `POST /api/actions/transfer-sol`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Sender wallet, as sent by wallets.
    pub account: Option<String>,
    /// Alias of `account`.
    pub sender: Option<String>,
    /// Recipient wallet.
    pub recipient: Option<String>,
    /// Amount in SOL.
    pub amount_sol: Option<f64>,
    /// Alias of `amount_sol`.
    pub amount: Option<f64>,
    /// Optional user memo.
    pub memo: Option<String>,
}

/// Diagnostics of a composed transfer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferMeta {
    /// Common diagnostics.
    #[serde(flatten)]
    pub common: ComposeMeta,
    /// Compute-unit limit requested.
    pub compute_unit_limit: u32,
}

/// Action metadata for `origin`.
///
/// # Errors
///
/// Returns [`ActionError::Internal`] if `origin` does not form valid URLs.
pub fn metadata(origin: &str) -> Result<ActionGetResponse, ActionError> {
    let blink = blink_url(origin, BLINK_PATH, ACTION_PATH, LABEL, BLINK_MESSAGE)?;
    Ok(ActionMetadata {
        title: "Institutional SOL Transfer",
        description: "Compose a SOL transfer with compute, fee, and blockhash guards.",
        icon: ICON_URL,
        label: LABEL,
        action: LinkedAction::transaction(
            ACTION_PATH,
            LABEL,
            vec![
                ActionParameter::address("recipient", "Recipient Address"),
                ActionParameter::new("amountSol", "Amount (SOL)", ParameterType::Number, true)
                    .with_range(Some(0.000_001), None),
                ActionParameter::new("memo", "Memo (optional)", ParameterType::Textarea, false),
            ],
        ),
        related: vec![LinkedAction::inspector(&blink)],
    }
    .into_response())
}

/// `GET` handler.
///
/// # Errors
///
/// See [`metadata`].
pub async fn get_metadata<K: RpcConnector>(
    State(state): State<Arc<ActionsState<K>>>,
    headers: HeaderMap,
) -> Result<Json<ActionGetResponse>, ActionError> {
    metadata(&state.origin(&headers)).map(Json)
}

/// `POST` handler.
///
/// # Errors
///
/// See [`compose`].
pub async fn post_compose<K: RpcConnector>(
    State(state): State<Arc<ActionsState<K>>>,
    headers: HeaderMap,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<ActionPostResponse<TransferMeta>>, ActionError> {
    let Json(request) = payload?;
    compose(&state.core, &request, &state.origin(&headers)).await.map(Json)
}

/// Composes, simulates and encodes an unsigned SOL transfer.
///
/// Instruction order: compute-unit limit, compute-unit price, transfer,
/// identity memo, user memo.
///
/// # Errors
///
/// Returns [`ActionError`] on invalid input, RPC failure or a failed simulation.
pub async fn compose<K: RpcConnector>(
    core: &SolanaCore<K>,
    request: &TransferRequest,
    origin: &str,
) -> Result<ActionPostResponse<TransferMeta>, ActionError> {
    let sender = parse_pubkey(request.account.as_deref().or(request.sender.as_deref()), "account")?;
    let recipient = parse_pubkey(request.recipient.as_deref(), "recipient")?;
    let amount_sol = request
        .amount_sol
        .or(request.amount)
        .filter(|amount| amount.is_finite() && *amount > 0.0)
        .ok_or_else(|| ActionError::invalid("amountSol must be a positive number"))?;
    let lamports = sol_to_lamports(amount_sol)?;

    let connection = core.connection(None, None, Some(RpcPurpose::Send)).await?;
    let fee = core
        .estimate_priority_fee(&PriorityFeeRequest::for_accounts([
            sender.to_string(),
            recipient.to_string(),
        ]))
        .await?;

    let mut instructions = Vec::with_capacity(5);
    instructions.extend(compute_budget_instructions(DEFAULT_COMPUTE_UNIT_LIMIT, fee.chosen)?);
    instructions.push(solana_system_interface::instruction::transfer(&sender, &recipient, lamports));
    instructions.extend(core.identity_memo(None));
    instructions.extend(user_memo_instruction(request.memo.as_deref()));

    let send_commitment = core.config().commitment_for(RpcPurpose::Send, None);
    let fresh = fetch_fresh_blockhash(&connection, send_commitment).await?;
    let mut transaction = build_versioned_transaction(&sender, &instructions, fresh.blockhash, &[])?;

    let simulation = simulate_and_report(&connection, &transaction, SimulationOptions::default()).await?;
    let encoded = serialize_transaction_base64(&mut transaction)?;

    let meta = TransferMeta {
        common: ComposeMeta {
            network: connection.cluster().network_label(),
            rpc_endpoint: connection.endpoint.clone(),
            priority_fee_microlamports: fee.chosen,
            blockhash: fresh.blockhash.to_string(),
            last_valid_block_height: fresh.last_valid_block_height,
            blink_url: blink_url(origin, BLINK_PATH, ACTION_PATH, LABEL, BLINK_MESSAGE)?,
            explorer_hint: connection.explorer_url("<signature>"),
            logs: simulation.logs.clone(),
        },
        compute_unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
    };
    Ok(ActionPostResponse::transaction(
        encoded,
        "Simulate then sign to transfer SOL.",
        simulation.logs,
        meta,
    ))
}
