// failure-analysis-rs/src/error.rs
// Error types for the analysis agent and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::llm_client::LLMError;

/// Substrings that mark a provider error as a credential problem
const AUTH_MARKERS: [&str; 3] = ["api_key", "authentication", "401"];

/// Failures surfaced by the analysis agent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    /// Model output never matched the analysis shape
    #[error("{0}")]
    Validation(String),

    /// Provider could not be reached
    #[error("{0}")]
    Transport(String),

    /// Anything else the provider raised, including HTTP error statuses
    #[error("{0}")]
    Provider(String),
}

impl AgentError {
    /// Message heuristic for credential failures.
    ///
    /// Only provider errors qualify; validation and transport failures are
    /// always surfaced.
    pub fn is_authentication_failure(&self) -> bool {
        match self {
            AgentError::Provider(msg) => {
                let lowered = msg.to_lowercase();
                AUTH_MARKERS.iter().any(|marker| lowered.contains(marker))
            }
            _ => false,
        }
    }
}

impl From<LLMError> for AgentError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::NetworkError(_) => AgentError::Transport(err.to_string()),
            other => AgentError::Provider(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Failures of the analyze endpoint after payload validation
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Agent validation failed: {0}")]
    AgentValidation(String),

    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AgentValidation(_) | ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Validation(msg) => ApiError::AgentValidation(msg),
            AgentError::Transport(msg) => ApiError::ProviderUnavailable(msg),
            AgentError::Provider(msg) => ApiError::Server(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse { detail: self.to_string() })).into_response()
    }
}
