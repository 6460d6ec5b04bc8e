//! Jito bundle relay.
//!
//! Bundles are optional: a disabled relay, a missing URL or a zero tip all
//! skip submission instead of failing.

use std::time::{SystemTime, UNIX_EPOCH};

use fartnode::{Commitment, SolanaCoreConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use solana_transaction::versioned::VersionedTransaction;
use url::Url;

use crate::chain::{Connection, RpcClientLike};
use crate::message::{MessageError, encode_transaction_base64};
use crate::simulate::{SimulateError, SimulationOptions, simulate_and_report};

/// Default tip cap in lamports (0.001 SOL).
pub const DEFAULT_TIP_CAP_LAMPORTS: u64 = 1_000_000;

/// Errors raised by [`JitoClient::maybe_send_bundle`].
#[derive(Debug, thiserror::Error)]
pub enum JitoError {
    /// The requested tip is above the configured cap.
    #[error("Jito tip exceeds cap ({tip} > {cap})")]
    TipExceedsCap {
        /// Requested tip in lamports.
        tip: u64,
        /// Configured cap in lamports.
        cap: u64,
    },
    /// The pre-submission simulation failed.
    #[error(transparent)]
    Simulation(#[from] SimulateError),
    /// The transaction could not be encoded.
    #[error(transparent)]
    Encode(#[from] MessageError),
    /// The request could not be sent or its body read.
    #[error("Jito bundle request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The relay answered with a non-success status.
    #[error("Jito bundle request failed ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The relay returned a JSON-RPC error.
    #[error("Jito bundle error: {0}")]
    Relay(String),
    /// The relay returned neither a result nor an error.
    #[error("Jito bundle response missing signature result")]
    MissingResult,
}

#[derive(Debug, Serialize)]
struct BundleRequest {
    jsonrpc: &'static str,
    id: String,
    method: &'static str,
    params: (Vec<String>, serde_json::Value),
}

#[derive(Debug, Default, Deserialize)]
struct RelayError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BundleResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RelayError>,
}

/// Client for a Jito block-engine `sendBundle` endpoint.
#[derive(Debug, Clone)]
pub struct JitoClient {
    http: Client,
    url: Option<Url>,
    enabled: bool,
    max_tip_lamports: u64,
    simulation_commitment: Commitment,
}

impl JitoClient {
    /// Creates a client.
    #[must_use]
    pub fn new(url: Option<Url>, enabled: bool) -> Self {
        Self {
            http: Client::new(),
            url,
            enabled,
            max_tip_lamports: DEFAULT_TIP_CAP_LAMPORTS,
            simulation_commitment: Commitment::Confirmed,
        }
    }

    /// Creates a client from the configured relay URL and switch; simulations
    /// run at the configured read commitment.
    #[must_use]
    pub fn from_config(config: &SolanaCoreConfig) -> Self {
        Self {
            simulation_commitment: config.read_commitment,
            ..Self::new(config.jito_url.clone(), config.jito_enabled)
        }
    }

    /// Sets the tip cap.
    #[must_use]
    pub const fn with_max_tip(mut self, max_tip_lamports: u64) -> Self {
        self.max_tip_lamports = max_tip_lamports;
        self
    }

    /// Sets the default simulation commitment.
    #[must_use]
    pub const fn with_simulation_commitment(mut self, commitment: Commitment) -> Self {
        self.simulation_commitment = commitment;
        self
    }

    /// Uses `http` for requests.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Whether bundles are enabled at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The relay URL, when configured.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Simulates `transaction` and submits it as a single-transaction bundle.
    ///
    /// Returns `Ok(None)` when the relay is disabled, unconfigured, or the tip
    /// is zero; otherwise the relay's result string.
    ///
    /// # Errors
    ///
    /// Returns [`JitoError`] when the tip is over the cap, the simulation
    /// fails, or the relay rejects the bundle.
    pub async fn maybe_send_bundle<C: RpcClientLike>(
        &self,
        connection: &Connection<C>,
        transaction: &VersionedTransaction,
        tip_lamports: u64,
        simulation_commitment: Option<Commitment>,
    ) -> Result<Option<String>, JitoError> {
        if !self.enabled {
            return Ok(None);
        }
        let Some(url) = &self.url else {
            #[cfg(feature = "telemetry")]
            tracing::warn!("[jito] bundle skipped: URL not configured");
            return Ok(None);
        };
        if tip_lamports == 0 {
            #[cfg(feature = "telemetry")]
            tracing::warn!("[jito] bundle skipped: invalid tip");
            return Ok(None);
        }
        if tip_lamports > self.max_tip_lamports {
            return Err(JitoError::TipExceedsCap {
                tip: tip_lamports,
                cap: self.max_tip_lamports,
            });
        }

        let options = SimulationOptions::default()
            .with_commitment(simulation_commitment.unwrap_or(self.simulation_commitment));
        simulate_and_report(connection, transaction, options).await?;

        let request = BundleRequest {
            jsonrpc: "2.0",
            id: request_id(),
            method: "sendBundle",
            params: (
                vec![encode_transaction_base64(transaction)?],
                json!({ "tipLamports": tip_lamports }),
            ),
        };
        let response = self
            .http
            .post(url.clone())
            .json(&request)
            .send()
            .await
            .map_err(JitoError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JitoError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let payload: BundleResponse = response.json().await.map_err(JitoError::Transport)?;
        if let Some(error) = payload.error {
            return Err(JitoError::Relay(
                error.message.unwrap_or_else(|| "unknown error".to_owned()),
            ));
        }
        let result = payload
            .result
            .filter(|result| !result.is_empty())
            .ok_or(JitoError::MissingResult)?;

        #[cfg(feature = "telemetry")]
        tracing::info!(tip_lamports, url = %url, "[jito] bundle dispatched");
        Ok(Some(result))
    }
}

fn request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    format!("fartnode-{millis}")
}
