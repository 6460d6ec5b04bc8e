//! `GET|POST /api/solana/devnet-airdrop`
//!
//! Requests devnet SOL for a wallet and returns a placeholder transaction the
//! wallet can sign to confirm it is funded. The airdrop and the simulation
//! are both advisory: their failures are reported, never raised.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use fartnode_svm::compute::{PriorityFeeConfig, with_compute_budget, with_priority_fee};
use fartnode_svm::message::serialize_transaction_base64;
use fartnode_svm::simulate::simulate_first;
use fartnode_svm::{RpcClientLike, RpcConnector, SolanaCore, build_versioned_transaction, fetch_fresh_blockhash};
use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;

use super::{ActionsState, sol_to_lamports};
use crate::config::ActionsConfig;
use crate::error::ActionError;

/// Route path.
pub const ACTION_PATH: &str = "/api/solana/devnet-airdrop";

/// Largest airdrop accepted, in SOL.
pub const MAX_AIRDROP_SOL: f64 = 5.0;
/// Airdrop amount when none is given, in SOL.
pub const DEFAULT_AIRDROP_SOL: f64 = 1.0;

/// One input of [`AirdropMetadata`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirdropInput {
    /// Field name.
    pub name: &'static str,
    /// `string` or `number`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Whether the field must be present.
    pub required: bool,
    /// Value used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
}

/// `GET` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirdropMetadata {
    /// Title.
    pub title: &'static str,
    /// Description.
    pub description: &'static str,
    /// Accepted inputs.
    pub inputs: Vec<AirdropInput>,
}

/// Body of `POST /api/solana/devnet-airdrop`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropRequest {
    /// Wallet to fund.
    pub public_key: Option<String>,
    /// Amount in SOL, at most [`MAX_AIRDROP_SOL`].
    pub amount_sol: Option<f64>,
}

/// `POST` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropResponse {
    /// Base64 wire transaction.
    pub transaction_base64: String,
    /// Always `devnet`.
    pub network: &'static str,
    /// Hint that wallets should simulate before signing.
    pub simulate_first: bool,
    /// Signature of the airdrop, when the faucet accepted it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airdrop_signature: Option<String>,
    /// Why the advisory simulation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_error: Option<String>,
}

/// Static route metadata.
#[must_use]
pub fn metadata() -> AirdropMetadata {
    AirdropMetadata {
        title: "Devnet Airdrop",
        description: "Request SOL on devnet and return a versioned transaction.",
        inputs: vec![
            AirdropInput {
                name: "publicKey",
                kind: "string",
                required: true,
                default: None,
            },
            AirdropInput {
                name: "amountSol",
                kind: "number",
                required: false,
                default: Some(DEFAULT_AIRDROP_SOL),
            },
        ],
    }
}

/// `GET` handler.
pub async fn get_metadata() -> Json<AirdropMetadata> {
    Json(metadata())
}

/// `POST` handler.
///
/// # Errors
///
/// See [`compose`].
pub async fn post_compose<K: RpcConnector>(
    State(state): State<Arc<ActionsState<K>>>,
    payload: Result<Json<AirdropRequest>, JsonRejection>,
) -> Result<Json<AirdropResponse>, ActionError> {
    let Json(request) = payload?;
    compose(&state.core, &state.config, &request).await.map(Json)
}

fn validate(request: &AirdropRequest) -> Result<(Pubkey, f64), ActionError> {
    let recipient = request
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ActionError::invalid("publicKey is required"))?
        .parse::<Pubkey>()
        .map_err(|_| ActionError::invalid("Invalid publicKey"))?;
    let amount_sol = request.amount_sol.unwrap_or(DEFAULT_AIRDROP_SOL);
    if amount_sol.is_nan() || amount_sol <= 0.0 {
        return Err(ActionError::invalid("amountSol must be greater than 0"));
    }
    if amount_sol > MAX_AIRDROP_SOL {
        return Err(ActionError::invalid(format!("amountSol must be <= {MAX_AIRDROP_SOL}")));
    }
    Ok((recipient, amount_sol))
}

/// Requests the airdrop on the configured devnet endpoint and composes a
/// placeholder `[limit, price, transfer 0 to self]` transaction.
///
/// # Errors
///
/// Returns [`ActionError`] on invalid input, when the devnet endpoint is
/// unreachable, or when the blockhash cannot be fetched.
pub async fn compose<K: RpcConnector>(
    core: &SolanaCore<K>,
    config: &ActionsConfig,
    request: &AirdropRequest,
) -> Result<AirdropResponse, ActionError> {
    let (recipient, amount_sol) = validate(request)?;
    let lamports = sol_to_lamports(amount_sol)?;
    let connection = core.connection(Some(&config.devnet_rpc_url), None, None).await?;

    let airdrop_signature = match connection.client.request_airdrop(&recipient, lamports).await {
        Ok(signature) => Some(signature.to_string()),
        Err(_e) => {
            #[cfg(feature = "telemetry")]
            tracing::warn!(recipient = %recipient, error = %_e, "devnet airdrop request failed");
            None
        }
    };

    let fresh = fetch_fresh_blockhash(&connection, connection.commitment).await?;
    let instructions = [
        with_compute_budget(None, None),
        with_priority_fee(&PriorityFeeConfig::default()),
        solana_system_interface::instruction::transfer(&recipient, &recipient, 0),
    ];
    let mut transaction = build_versioned_transaction(&recipient, &instructions, fresh.blockhash, &[])?;

    let simulation_error = match simulate_first(&connection, &transaction, None).await {
        Ok(_) => None,
        Err(err) => {
            #[cfg(feature = "telemetry")]
            tracing::warn!(error = %err, "simulation failed (continuing with simulateFirst=true)");
            Some(err.to_string())
        }
    };

    Ok(AirdropResponse {
        transaction_base64: serialize_transaction_base64(&mut transaction)?,
        network: "devnet",
        simulate_first: true,
        airdrop_signature,
        simulation_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DEVNET_RPC_URL;
    use crate::routes::test_support::{app, call, connector};
    use axum::http::StatusCode;
    use fartnode_svm::compute::is_compute_budget_instruction;
    use fartnode_svm::message::{decompile_instructions, deserialize_transaction_base64};
    use fartnode_svm::testing::MockRpc;
    use serde_json::json;

    #[tokio::test]
    async fn metadata_is_static() {
        let (connector, _rpc) = connector();

        let (status, body) = call(app(&connector, None), "GET", ACTION_PATH, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Devnet Airdrop");
        assert_eq!(body["inputs"][1], json!({"name": "amountSol", "type": "number", "required": false, "default": 1.0}));
    }

    #[tokio::test]
    async fn airdrops_and_returns_placeholder_on_devnet() {
        let (connector, mainnet) = connector();
        let devnet = connector.register(MockRpc::new(DEFAULT_DEVNET_RPC_URL));
        let wallet = Pubkey::new_unique();

        let (status, body) = call(
            app(&connector, None),
            "POST",
            ACTION_PATH,
            Some(json!({"publicKey": wallet.to_string(), "amountSol": 2})),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["network"], "devnet");
        assert_eq!(body["simulateFirst"], true);
        assert!(body["airdropSignature"].is_string());
        assert!(body.get("simulationError").is_none());
        assert_eq!(devnet.state().airdrops, vec![(wallet, 2_000_000_000)]);
        assert!(devnet.state().simulate_configs[0].replace_recent_blockhash);
        assert!(mainnet.state().simulated.is_empty());

        let tx = deserialize_transaction_base64(body["transactionBase64"].as_str().unwrap()).unwrap();
        let instructions = decompile_instructions(&tx.message, &[]).unwrap();
        assert_eq!(instructions.len(), 3);
        assert!(is_compute_budget_instruction(&instructions[0]));
        assert!(is_compute_budget_instruction(&instructions[1]));
        assert_eq!(instructions[2].program_id, solana_system_interface::program::ID);
        assert_eq!(tx.message.static_account_keys()[0], wallet);
    }

    #[tokio::test]
    async fn failures_of_advisory_steps_are_reported() {
        let (connector, _mainnet) = connector();
        let devnet = connector.register(MockRpc::new(DEFAULT_DEVNET_RPC_URL).with(|state| {
            state.airdrop = Err("faucet dry".to_owned());
            state.simulation = Err("node busy".to_owned());
        }));

        let (status, body) = call(
            app(&connector, None),
            "POST",
            ACTION_PATH,
            Some(json!({"publicKey": Pubkey::new_unique().to_string()})),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body.get("airdropSignature").is_none());
        assert!(body["simulationError"].as_str().unwrap().contains("node busy"));
        assert_eq!(devnet.state().airdrops[0].1, 1_000_000_000);
    }

    #[tokio::test]
    async fn input_is_validated() {
        let (connector, _rpc) = connector();
        let cases = [
            (json!({}), "publicKey is required"),
            (json!({"publicKey": "nope"}), "Invalid publicKey"),
            (json!({"publicKey": Pubkey::new_unique().to_string(), "amountSol": 0}), "amountSol must be greater than 0"),
            (json!({"publicKey": Pubkey::new_unique().to_string(), "amountSol": 6}), "amountSol must be <= 5"),
        ];

        for (input, message) in cases {
            let (status, body) = call(app(&connector, None), "POST", ACTION_PATH, Some(input)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], message);
        }
    }
}
