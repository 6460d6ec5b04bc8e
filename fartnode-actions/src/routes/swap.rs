//! `GET|POST /api/actions/swap`

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use fartnode::RpcPurpose;
use fartnode_svm::compute::compute_budget_instructions;
use fartnode_svm::jupiter::{DEFAULT_SLIPPAGE_BPS, QuoteRequest, SwapRequest};
use fartnode_svm::memo::user_memo_instruction;
use fartnode_svm::message::{append_with_compute_budget, replace_blockhash, serialize_transaction_base64};
use fartnode_svm::simulate::SimulationOptions;
use fartnode_svm::{PriorityFeeRequest, RpcConnector, SolanaCore, fetch_fresh_blockhash, simulate_and_report};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_pubkey::Pubkey;

use super::{ActionsState, ComposeMeta, blink_url};
use crate::blink::{
    ActionGetResponse, ActionMetadata, ActionParameter, ActionPostResponse, LinkedAction, ParameterType,
};
use crate::error::ActionError;

/// Action API path.
pub const ACTION_PATH: &str = "/api/actions/swap";
/// Blink path.
pub const BLINK_PATH: &str = "/actions/swap";

const LABEL: &str = "Swap via Jupiter";
const ICON_URL: &str = "https://www.jup.ag/favicon.ico";
const BLINK_MESSAGE: &str = "Execute a Jupiter swap with institutional safeguards.";

/// Compute-unit limit of swap transactions.
pub const SWAP_COMPUTE_UNIT_LIMIT: u32 = 1_000_000;

/// Body of `POST /api/actions/swap`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequestBody {
    /// Wallet that signs and pays.
    pub account: Option<String>,
    /// Amount in input-mint base units; fractions are floored.
    pub amount: Option<f64>,
    /// Mint sold.
    pub input_mint: Option<String>,
    /// Mint bought.
    pub output_mint: Option<String>,
    /// Slippage tolerance, default 50.
    pub slippage_bps: Option<u16>,
    /// Optional user memo.
    pub memo: Option<String>,
}

/// Quote fields echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    /// Input amount.
    pub in_amount: u64,
    /// Expected output amount.
    pub out_amount: u64,
    /// Price impact, as a fraction.
    pub price_impact_pct: f64,
    /// Route legs.
    pub route_plan: Vec<Value>,
}

/// Diagnostics of a composed swap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapMeta {
    /// Common diagnostics.
    #[serde(flatten)]
    pub common: ComposeMeta,
    /// The executed quote.
    pub quote: QuoteSummary,
}

/// Action metadata for `origin`.
///
/// # Errors
///
/// Returns [`ActionError::Internal`] if `origin` does not form valid URLs.
pub fn metadata(origin: &str) -> Result<ActionGetResponse, ActionError> {
    let blink = blink_url(origin, BLINK_PATH, ACTION_PATH, LABEL, BLINK_MESSAGE)?;
    Ok(ActionMetadata {
        title: "Institutional Jupiter Swap",
        description: "Quote + build via Jupiter with priority fees, simulation, and blockhash guards.",
        icon: ICON_URL,
        label: LABEL,
        action: LinkedAction::transaction(
            ACTION_PATH,
            LABEL,
            vec![
                ActionParameter::address("inputMint", "Input Mint"),
                ActionParameter::address("outputMint", "Output Mint"),
                ActionParameter::new("amount", "Amount (base units)", ParameterType::Number, true)
                    .with_range(Some(1.0), None),
                ActionParameter::new("slippageBps", "Slippage (bps, default 50)", ParameterType::Number, false)
                    .with_range(Some(1.0), Some(1000.0)),
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
    payload: Result<Json<SwapRequestBody>, JsonRejection>,
) -> Result<Json<ActionPostResponse<SwapMeta>>, ActionError> {
    let Json(request) = payload?;
    compose(&state.core, &request, &state.origin(&headers)).await.map(Json)
}

fn parse_key(value: Option<&str>, field: &str) -> Result<Pubkey, ActionError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ActionError::invalid(format!("{field} is required")))?;
    value
        .parse()
        .map_err(|_| ActionError::invalid(format!("{field} is not a valid public key")))
}

fn parse_amount(amount: Option<f64>) -> Result<u64, ActionError> {
    let floored = amount.filter(|a| a.is_finite()).map(f64::floor).unwrap_or_default();
    if floored < 1.0 || floored > u64::MAX as f64 {
        return Err(ActionError::invalid("amount must be a positive number"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(floored as u64)
}

/// Quotes and builds a Jupiter swap, then re-targets it at a fresh blockhash,
/// appends memos, prepends the compute budget and simulates the result.
///
/// # Errors
///
/// Returns [`ActionError`] on invalid input, Jupiter or RPC failure, or a
/// failed simulation.
pub async fn compose<K: RpcConnector>(
    core: &SolanaCore<K>,
    request: &SwapRequestBody,
    origin: &str,
) -> Result<ActionPostResponse<SwapMeta>, ActionError> {
    let user = parse_key(request.account.as_deref(), "account")?;
    let input_mint = parse_key(request.input_mint.as_deref(), "inputMint")?;
    let output_mint = parse_key(request.output_mint.as_deref(), "outputMint")?;
    let amount = parse_amount(request.amount)?;
    let slippage_bps = request.slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS);

    let connection = core.connection(None, None, Some(RpcPurpose::Send)).await?;
    let fee = core
        .estimate_priority_fee(&PriorityFeeRequest::for_accounts([user.to_string()]))
        .await?;

    let quote = core
        .jupiter()
        .quote(&QuoteRequest::new(input_mint, output_mint, amount).with_slippage_bps(slippage_bps))
        .await?;
    let swap_request = SwapRequest::new(quote, user).with_compute_unit_price(fee.chosen);
    let built = core.jupiter().build_swap(&connection, &swap_request, None).await?;

    let send_commitment = core.config().commitment_for(RpcPurpose::Send, None);
    let fresh = fetch_fresh_blockhash(&connection, send_commitment).await?;
    let mut transaction = built.transaction;
    replace_blockhash(&mut transaction, fresh.blockhash);

    let memos: Vec<_> = core
        .identity_memo(None)
        .into_iter()
        .chain(user_memo_instruction(request.memo.as_deref()))
        .collect();
    let mut transaction = append_with_compute_budget(
        &*connection.client,
        transaction,
        memos,
        compute_budget_instructions(SWAP_COMPUTE_UNIT_LIMIT, fee.chosen)?,
    )
    .await?;

    let simulation = simulate_and_report(&connection, &transaction, SimulationOptions::default()).await?;
    let encoded = serialize_transaction_base64(&mut transaction)?;

    #[cfg(feature = "telemetry")]
    tracing::info!(
        user = %user,
        input_mint = %input_mint,
        output_mint = %output_mint,
        amount,
        slippage_bps,
        out_amount = swap_request.quote.out_amount,
        "swap composed"
    );

    let quote = swap_request.quote;
    let meta = SwapMeta {
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
        quote: QuoteSummary {
            in_amount: quote.in_amount,
            out_amount: quote.out_amount,
            price_impact_pct: quote.price_impact_pct,
            route_plan: quote.route_plan,
        },
    };
    Ok(ActionPostResponse::transaction(
        encoded,
        "Simulate then sign to execute the Jupiter swap.",
        simulation.logs,
        meta,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{app, call, connector};
    use axum::http::StatusCode;
    use fartnode_svm::build_versioned_transaction;
    use fartnode_svm::compute::is_compute_budget_instruction;
    use fartnode_svm::memo::memo_instruction;
    use fartnode_svm::message::{decompile_instructions, deserialize_transaction_base64};
    use serde_json::json;
    use solana_message::Hash;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SOL: &str = "So11111111111111111111111111111111111111112";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn quote_json() -> Value {
        json!({
            "inputMint": SOL,
            "outputMint": USDC,
            "inAmount": "1000000",
            "outAmount": "171234",
            "otherAmountThreshold": "170378",
            "swapMode": "ExactIn",
            "slippageBps": 50,
            "priceImpactPct": "0.0001",
            "routePlan": [{"percent": 100}]
        })
    }

    fn jupiter_transaction(user: &Pubkey) -> String {
        let mut tx = build_versioned_transaction(
            user,
            &[memo_instruction("jupiter route")],
            Hash::new_from_array([1; 32]),
            &[],
        )
        .unwrap();
        serialize_transaction_base64(&mut tx).unwrap()
    }

    async fn jupiter(user: &Pubkey) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/quote"))
            .and(query_param("amount", "1000000"))
            .and(query_param("slippageBps", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_json()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v6/swap"))
            .and(body_partial_json(json!({
                "userPublicKey": user.to_string(),
                "computeUnitPriceMicroLamports": 5_000
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"swapTransaction": jupiter_transaction(user)})),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn metadata_lists_swap_parameters() {
        let (connector, _rpc) = connector();

        let (status, body) = call(app(&connector, None), "GET", ACTION_PATH, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], "Swap via Jupiter");
        let params = &body["links"]["actions"][0]["parameters"];
        assert_eq!(params[0]["name"], "inputMint");
        assert_eq!(params[3]["max"], 1000.0);
        assert_eq!(params[3]["required"], false);
    }

    #[tokio::test]
    async fn composes_swap_with_fresh_blockhash_and_budget() {
        let (connector, rpc) = connector();
        let user = Pubkey::new_unique();
        let server = jupiter(&user).await;

        let (status, body) = call(
            app(&connector, Some(server.uri().parse().unwrap())),
            "POST",
            ACTION_PATH,
            Some(json!({
                "account": user.to_string(),
                "inputMint": SOL,
                "outputMint": USDC,
                "amount": 1_000_000.7,
                "memo": "desk 7"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Simulate then sign to execute the Jupiter swap.");
        let meta = &body["meta"];
        assert_eq!(meta["priorityFeeMicrolamports"], 5_000);
        assert_eq!(meta["quote"]["inAmount"], 1_000_000);
        assert_eq!(meta["quote"]["outAmount"], 171_234);
        assert_eq!(meta["quote"]["routePlan"], json!([{"percent": 100}]));
        assert!(meta["blinkUrl"].as_str().unwrap().starts_with("https://demo.example/actions/swap?action="));

        let tx = deserialize_transaction_base64(body["transaction"].as_str().unwrap()).unwrap();
        assert_eq!(*tx.message.recent_blockhash(), Hash::new_from_array([7; 32]));
        let instructions = decompile_instructions(&tx.message, &[]).unwrap();
        assert_eq!(instructions.len(), 4);
        assert!(is_compute_budget_instruction(&instructions[0]));
        assert!(is_compute_budget_instruction(&instructions[1]));
        assert_eq!(instructions[2].data, b"jupiter route");
        assert_eq!(instructions[3].data, b"desk 7");
        assert_eq!(rpc.state().simulated.len(), 2);
        assert_eq!(rpc.state().fee_requests[0], vec![user]);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_quoting() {
        let (connector, _rpc) = connector();
        let server = MockServer::start().await;
        let app = || app(&connector, Some(server.uri().parse().unwrap()));

        let (status, body) = call(
            app(),
            "POST",
            ACTION_PATH,
            Some(json!({"account": Pubkey::new_unique().to_string(), "inputMint": "xyz", "outputMint": USDC, "amount": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "inputMint is not a valid public key");

        let (status, body) = call(
            app(),
            "POST",
            ACTION_PATH,
            Some(json!({"account": Pubkey::new_unique().to_string(), "inputMint": SOL, "outputMint": USDC, "amount": 0.5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "amount must be a positive number");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn jupiter_failure_is_bad_gateway() {
        let (connector, _rpc) = connector();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/quote"))
            .respond_with(ResponseTemplate::new(400).set_body_string("no route"))
            .mount(&server)
            .await;

        let (status, body) = call(
            app(&connector, Some(server.uri().parse().unwrap())),
            "POST",
            ACTION_PATH,
            Some(json!({"account": Pubkey::new_unique().to_string(), "inputMint": SOL, "outputMint": USDC, "amount": 10})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Jupiter quote failed (400): no route");
    }
}
