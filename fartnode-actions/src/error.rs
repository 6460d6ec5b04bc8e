//! Error types for the actions server.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fartnode_svm::chain::ClientError;
use fartnode_svm::compute::ComputeBudgetError;
use fartnode_svm::{CoreError, JupiterError, MessageError, SelectorError, SimulateError, SimulationError};

/// Errors that can occur while composing an action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The request was malformed or failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The composed transaction failed simulation.
    #[error("{0}")]
    Simulation(SimulationError),

    /// No RPC endpoint was healthy.
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// An RPC node, Jupiter or another upstream service failed.
    #[error("{0}")]
    Upstream(String),

    /// The transaction could not be assembled.
    #[error("{0}")]
    Internal(String),
}

impl ActionError {
    /// Creates an input validation error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Simulation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Selector(_) | Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ActionError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<SimulateError> for ActionError {
    fn from(err: SimulateError) -> Self {
        match err {
            SimulateError::Failed(failure) => Self::Simulation(failure),
            SimulateError::Rpc(err) => Self::Upstream(format!("simulation request failed: {err}")),
        }
    }
}

impl From<CoreError> for ActionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Selector(err) => Self::Selector(err),
            CoreError::Rpc(err) => Self::Upstream(err.to_string()),
        }
    }
}

impl From<ClientError> for ActionError {
    fn from(err: ClientError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<MessageError> for ActionError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::MissingLookupTable { .. } => Self::Upstream(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ComputeBudgetError> for ActionError {
    fn from(err: ComputeBudgetError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<JupiterError> for ActionError {
    fn from(err: JupiterError) -> Self {
        match err {
            JupiterError::Simulation(err) => err.into(),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let status = self.status();
        #[cfg(feature = "telemetry")]
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "action composition failed");
        }
        let body = match &self {
            Self::Simulation(failure) => serde_json::json!({
                "error": self.to_string(),
                "logs": failure.logs,
                "unitsConsumed": failure.units_consumed,
                "simulationError": failure.original_error,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    async fn body_of(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn simulation_failure_is_unprocessable_with_logs() {
        let failure = SimulationError {
            message: "Simulation returned a non-null error".to_owned(),
            logs: vec!["Program log: insufficient funds".to_owned()],
            units_consumed: Some(300),
            original_error: json!({"InstructionError": [2, {"Custom": 1}]}),
        };

        let response = ActionError::from(SimulateError::Failed(failure)).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_of(response).await;
        assert_eq!(body["error"], "Simulation returned a non-null error");
        assert_eq!(body["logs"][0], "Program log: insufficient funds");
        assert_eq!(body["simulationError"]["InstructionError"][0], 2);
    }

    #[tokio::test]
    async fn status_mapping() {
        assert_eq!(ActionError::invalid("bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ActionError::from(JupiterError::MissingTransaction).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ActionError::from(ComputeBudgetError::NonPositiveLimit).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let response = ActionError::invalid("recipient is required").into_response();
        assert_eq!(body_of(response).await, json!({"error": "recipient is required"}));
    }
}
