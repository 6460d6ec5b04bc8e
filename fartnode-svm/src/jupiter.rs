//! Jupiter swap API client (`/v6/quote`, `/v6/swap`).
//!
//! Quotes are passed back to `/v6/swap` as received: unknown fields are kept
//! and amounts are re-serialized as strings, the way Jupiter emits them.

use fartnode::{Commitment, SolanaCoreConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use solana_pubkey::Pubkey;
use solana_transaction::versioned::VersionedTransaction;
use url::Url;

use crate::chain::{Connection, RpcClientLike};
use crate::message::{MessageError, deserialize_transaction_base64};
use crate::simulate::{SimulateError, SimulationOptions, SimulationReport, simulate_and_report};

/// Default slippage, in basis points (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u16 = 50;

/// Swap direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapMode {
    /// `amount` is the exact input.
    #[default]
    ExactIn,
    /// `amount` is the exact output.
    ExactOut,
}

impl SwapMode {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExactIn => "ExactIn",
            Self::ExactOut => "ExactOut",
        }
    }
}

/// Parameters of a quote request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    /// Mint sold.
    pub input_mint: Pubkey,
    /// Mint bought.
    pub output_mint: Pubkey,
    /// Amount in base units.
    pub amount: u64,
    /// Slippage tolerance in basis points.
    pub slippage_bps: u16,
    /// Swap direction.
    pub swap_mode: SwapMode,
}

impl QuoteRequest {
    /// An exact-in quote with the default slippage.
    #[must_use]
    pub const fn new(input_mint: Pubkey, output_mint: Pubkey, amount: u64) -> Self {
        Self {
            input_mint,
            output_mint,
            amount,
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            swap_mode: SwapMode::ExactIn,
        }
    }

    /// Sets the slippage tolerance.
    #[must_use]
    pub const fn with_slippage_bps(mut self, slippage_bps: u16) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    /// Sets the swap direction.
    #[must_use]
    pub const fn with_swap_mode(mut self, swap_mode: SwapMode) -> Self {
        self.swap_mode = swap_mode;
        self
    }
}

/// A Jupiter quote.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    /// Mint sold.
    pub input_mint: String,
    /// Mint bought.
    pub output_mint: String,
    /// Input amount in base units.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub in_amount: u64,
    /// Output amount in base units.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub out_amount: u64,
    /// Worst-case amount after slippage.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub other_amount_threshold: u64,
    /// Swap direction.
    pub swap_mode: SwapMode,
    /// Price impact, as a fraction.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub price_impact_pct: f64,
    /// Route legs, passed through untouched.
    #[serde(default)]
    pub route_plan: Vec<Value>,
    /// Slot the quote was computed at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_slot: Option<u64>,
    /// Any other fields Jupiter returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapBody<'a> {
    quote_response: &'a QuoteResponse,
    user_public_key: String,
    wrap_and_unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    compute_unit_price_micro_lamports: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapPayload {
    #[serde(default)]
    swap_transaction: Option<String>,
}

/// Parameters of a swap build.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    /// The quote to execute.
    pub quote: QuoteResponse,
    /// The wallet that signs and pays.
    pub user_public_key: Pubkey,
    /// Wrap SOL into wSOL and back as needed.
    pub wrap_and_unwrap_sol: bool,
    /// Priority fee Jupiter should embed.
    pub compute_unit_price_micro_lamports: Option<u64>,
}

impl SwapRequest {
    /// A request with SOL wrapping enabled and no priority fee.
    #[must_use]
    pub const fn new(quote: QuoteResponse, user_public_key: Pubkey) -> Self {
        Self {
            quote,
            user_public_key,
            wrap_and_unwrap_sol: true,
            compute_unit_price_micro_lamports: None,
        }
    }

    /// Sets the embedded priority fee.
    #[must_use]
    pub const fn with_compute_unit_price(mut self, micro_lamports: u64) -> Self {
        self.compute_unit_price_micro_lamports = Some(micro_lamports);
        self
    }
}

/// A swap transaction and its simulation.
#[derive(Debug, Clone)]
pub struct SwapBuild {
    /// The unsigned swap transaction.
    pub transaction: VersionedTransaction,
    /// Simulation of `transaction`.
    pub simulation: SimulationReport,
}

/// Errors raised by [`JupiterClient`].
#[derive(Debug, thiserror::Error)]
pub enum JupiterError {
    /// The endpoint URL could not be built.
    #[error("invalid Jupiter URL: {0}")]
    Url(#[from] url::ParseError),
    /// The request could not be sent.
    #[error("Jupiter {stage} request failed: {source}")]
    Transport {
        /// `quote` or `swap build`.
        stage: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Jupiter answered with a non-success status.
    #[error("Jupiter {stage} failed ({status}): {body}")]
    Status {
        /// `quote` or `swap build`.
        stage: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The response body was not the expected JSON.
    #[error("Jupiter {stage} response could not be decoded: {source}")]
    Decode {
        /// `quote` or `swap build`.
        stage: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The swap response carried no transaction.
    #[error("Jupiter swap response missing transaction payload")]
    MissingTransaction,
    /// The swap transaction could not be decoded.
    #[error(transparent)]
    Transaction(#[from] MessageError),
    /// Simulating the swap transaction failed.
    #[error(transparent)]
    Simulation(#[from] SimulateError),
}

/// Client for the Jupiter swap API.
#[derive(Debug, Clone)]
pub struct JupiterClient {
    http: Client,
    base_url: Url,
}

impl JupiterClient {
    /// Creates a client for `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Creates a client for the configured base URL.
    #[must_use]
    pub fn from_config(config: &SolanaCoreConfig) -> Self {
        Self::new(config.jupiter_base_url.clone())
    }

    /// Uses `http` for requests.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// The base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}{path}`, keeping any path prefix of the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, JupiterError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    async fn read_json<R: DeserializeOwned>(
        stage: &'static str,
        response: reqwest::Response,
    ) -> Result<R, JupiterError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JupiterError::Status {
                stage,
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|source| JupiterError::Decode { stage, source })
    }

    /// Fetches a quote.
    ///
    /// # Errors
    ///
    /// Returns [`JupiterError`] on transport failure, a non-success status, or an
    /// undecodable body.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, JupiterError> {
        const STAGE: &str = "quote";
        let mut url = self.endpoint("/v6/quote")?;
        url.query_pairs_mut()
            .append_pair("inputMint", &request.input_mint.to_string())
            .append_pair("outputMint", &request.output_mint.to_string())
            .append_pair("amount", &request.amount.to_string())
            .append_pair("slippageBps", &request.slippage_bps.to_string())
            .append_pair("swapMode", request.swap_mode.as_str());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| JupiterError::Transport { stage: STAGE, source })?;
        Self::read_json(STAGE, response).await
    }

    /// Builds the swap transaction for a quote.
    ///
    /// # Errors
    ///
    /// Returns [`JupiterError`] on transport failure, a non-success status, a
    /// missing payload or an undecodable transaction.
    pub async fn swap_transaction(
        &self,
        request: &SwapRequest,
    ) -> Result<VersionedTransaction, JupiterError> {
        const STAGE: &str = "swap build";
        let url = self.endpoint("/v6/swap")?;
        let body = SwapBody {
            quote_response: &request.quote,
            user_public_key: request.user_public_key.to_string(),
            wrap_and_unwrap_sol: request.wrap_and_unwrap_sol,
            compute_unit_price_micro_lamports: request.compute_unit_price_micro_lamports,
        };
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|source| JupiterError::Transport { stage: STAGE, source })?;
        let payload: SwapPayload = Self::read_json(STAGE, response).await?;
        let encoded = payload
            .swap_transaction
            .filter(|tx| !tx.is_empty())
            .ok_or(JupiterError::MissingTransaction)?;
        Ok(deserialize_transaction_base64(&encoded)?)
    }

    /// Builds the swap transaction and simulates it.
    ///
    /// # Errors
    ///
    /// Same as [`JupiterClient::swap_transaction`], plus
    /// [`JupiterError::Simulation`] when the simulation fails.
    pub async fn build_swap<C: RpcClientLike>(
        &self,
        connection: &Connection<C>,
        request: &SwapRequest,
        commitment: Option<Commitment>,
    ) -> Result<SwapBuild, JupiterError> {
        let transaction = self.swap_transaction(request).await?;
        let options = SimulationOptions {
            commitment,
            ..SimulationOptions::default()
        };
        let simulation = simulate_and_report(connection, &transaction, options).await?;
        Ok(SwapBuild {
            transaction,
            simulation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memo::memo_instruction;
    use crate::message::{build_versioned_transaction, serialize_transaction_base64};
    use crate::testing::MockRpc;
    use serde_json::json;
    use solana_message::Hash;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quote_json() -> Value {
        json!({
            "inputMint": "So11111111111111111111111111111111111111112",
            "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "inAmount": "1000000",
            "outAmount": "171234",
            "otherAmountThreshold": "170378",
            "swapMode": "ExactIn",
            "slippageBps": 50,
            "priceImpactPct": "0.0001",
            "routePlan": [{"percent": 100}],
            "contextSlot": 299_000_000u64,
            "timeTaken": 0.01
        })
    }

    fn client(server: &MockServer) -> JupiterClient {
        JupiterClient::new(server.uri().parse().unwrap())
    }

    #[tokio::test]
    async fn quote_sends_parameters_and_parses_string_amounts() {
        let server = MockServer::start().await;
        let input = Pubkey::new_unique();
        let output = Pubkey::new_unique();
        Mock::given(method("GET"))
            .and(path("/v6/quote"))
            .and(query_param("inputMint", input.to_string()))
            .and(query_param("outputMint", output.to_string()))
            .and(query_param("amount", "1000000"))
            .and(query_param("slippageBps", "50"))
            .and(query_param("swapMode", "ExactIn"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_json()))
            .expect(1)
            .mount(&server)
            .await;

        let quote = client(&server)
            .quote(&QuoteRequest::new(input, output, 1_000_000))
            .await
            .unwrap();

        assert_eq!(quote.in_amount, 1_000_000);
        assert_eq!(quote.out_amount, 171_234);
        assert!((quote.price_impact_pct - 0.0001).abs() < f64::EPSILON);
        assert_eq!(quote.route_plan.len(), 1);
        assert_eq!(quote.extra["slippageBps"], 50);

        let echoed = serde_json::to_value(&quote).unwrap();
        assert_eq!(echoed["inAmount"], "1000000");
        assert_eq!(echoed["timeTaken"], 0.01);
    }

    #[tokio::test]
    async fn quote_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/quote"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Could not find any route"))
            .mount(&server)
            .await;

        let err = client(&server)
            .quote(&QuoteRequest::new(Pubkey::new_unique(), Pubkey::new_unique(), 1))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Jupiter quote failed (400): Could not find any route");
    }

    #[tokio::test]
    async fn quote_accepts_any_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/quote"))
            .respond_with(ResponseTemplate::new(203).set_body_json(quote_json()))
            .mount(&server)
            .await;

        let quote = client(&server)
            .quote(&QuoteRequest::new(Pubkey::new_unique(), Pubkey::new_unique(), 1_000_000))
            .await
            .unwrap();

        assert_eq!(quote.out_amount, 171_234);
    }

    #[tokio::test]
    async fn swap_posts_quote_and_decodes_transaction() {
        let server = MockServer::start().await;
        let user = Pubkey::new_unique();
        let mut tx = build_versioned_transaction(
            &user,
            &[memo_instruction("swap")],
            Hash::new_from_array([1; 32]),
            &[],
        )
        .unwrap();
        let encoded = serialize_transaction_base64(&mut tx).unwrap();
        Mock::given(method("POST"))
            .and(path("/v6/swap"))
            .and(body_partial_json(json!({
                "userPublicKey": user.to_string(),
                "wrapAndUnwrapSol": true,
                "computeUnitPriceMicroLamports": 7_000,
                "quoteResponse": {"inAmount": "1000000"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "swapTransaction": encoded,
                "lastValidBlockHeight": 12
            })))
            .expect(1)
            .mount(&server)
            .await;

        let quote: QuoteResponse = serde_json::from_value(quote_json()).unwrap();
        let decoded = client(&server)
            .swap_transaction(&SwapRequest::new(quote, user).with_compute_unit_price(7_000))
            .await
            .unwrap();

        assert_eq!(decoded, tx);
    }

    #[tokio::test]
    async fn swap_without_payload_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v6/swap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let quote: QuoteResponse = serde_json::from_value(quote_json()).unwrap();
        let err = client(&server)
            .swap_transaction(&SwapRequest::new(quote, Pubkey::new_unique()))
            .await
            .unwrap_err();

        assert!(matches!(err, JupiterError::MissingTransaction));
    }

    #[tokio::test]
    async fn build_swap_simulates_the_transaction() {
        let server = MockServer::start().await;
        let user = Pubkey::new_unique();
        let mut tx =
            build_versioned_transaction(&user, &[memo_instruction("swap")], Hash::new_from_array([1; 32]), &[])
                .unwrap();
        Mock::given(method("POST"))
            .and(path("/v6/swap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "swapTransaction": serialize_transaction_base64(&mut tx).unwrap()
            })))
            .mount(&server)
            .await;
        let rpc = Arc::new(MockRpc::new("m"));
        let connection = Connection::new(
            "https://api.mainnet-beta.solana.com",
            Commitment::Confirmed,
            Arc::clone(&rpc),
        );

        let quote: QuoteResponse = serde_json::from_value(quote_json()).unwrap();
        let build = client(&server)
            .build_swap(&connection, &SwapRequest::new(quote, user), None)
            .await
            .unwrap();

        assert_eq!(build.transaction, tx);
        assert_eq!(build.simulation.units_consumed, Some(1_234));
        assert_eq!(rpc.state().simulated.len(), 1);
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let client = JupiterClient::new("https://proxy.example/jup/".parse().unwrap());
        assert_eq!(
            client.endpoint("/v6/quote").unwrap().as_str(),
            "https://proxy.example/jup/v6/quote"
        );
    }
}
