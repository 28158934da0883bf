use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use config_rs::AnalysisConfig;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

pub mod agent;
pub mod demo;
pub mod error;
pub mod llm_client;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

use agent::{format_prompt, AnalysisAgent, FailureAnalyzer};
use error::ApiError;
use llm_client::LLMError;
use types::{FailureAnalysis, FailureReport};
use validation::{payload_limit_config, validate_request_middleware, ApiValidationError};

pub const SERVICE_NAME: &str = "Explain My Failure API";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core service state: configuration plus the shared analyzer
pub struct AnalysisService {
    config: AnalysisConfig,
    analyzer: Arc<dyn FailureAnalyzer>,
}

impl AnalysisService {
    pub fn new(config: AnalysisConfig, analyzer: Arc<dyn FailureAnalyzer>) -> Self {
        Self { config, analyzer }
    }

    /// Build the service with the provider-backed agent
    pub fn from_config(config: AnalysisConfig) -> Result<Self, LLMError> {
        let agent = AnalysisAgent::new(&config)?;
        Ok(Self::new(config, Arc::new(agent)))
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        // Credentials cannot be combined with wildcards, so mirror the request instead
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true);

        Router::new()
            .route("/", get(Self::root_handler))
            .route("/health", get(Self::health_handler))
            .route("/analyze", post(Self::analyze_handler))
            .layer(middleware::from_fn(validate_request_middleware))
            .layer(payload_limit_config())
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self)
    }

    async fn root_handler() -> impl IntoResponse {
        Json(serde_json::json!({
            "service": SERVICE_NAME,
            "version": SERVICE_VERSION,
            "endpoints": [
                "GET /health",
                "POST /analyze"
            ]
        }))
    }

    async fn health_handler() -> impl IntoResponse {
        Json(serde_json::json!({ "status": "ok" }))
    }

    async fn analyze_handler(
        State(state): State<Arc<Self>>,
        payload: Result<Json<FailureReport>, JsonRejection>,
    ) -> Response {
        let report = match payload {
            Ok(Json(report)) => report,
            Err(rejection) => return ApiValidationError::from(rejection).into_response(),
        };

        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("analyze", %request_id);

        match state.analyze(&report).instrument(span).await {
            Ok(analysis) => Json(analysis).into_response(),
            Err(err) => err.into_response(),
        }
    }

    /// Serve one validated report.
    ///
    /// Demo mode answers from the canned responder. Live mode asks the
    /// analyzer and drops back to the canned responder when the provider
    /// rejects the credential.
    pub async fn analyze(&self, report: &FailureReport) -> Result<FailureAnalysis, ApiError> {
        if self.config.is_demo_mode() {
            tracing::info!(
                template = demo::classify(&report.description).name,
                "Using demo mode - API key not set"
            );
            return Ok(Self::demo_response(report));
        }

        let prompt = format_prompt(report);
        match self.analyzer.analyze(&prompt).await {
            Ok(analysis) => {
                tracing::info!("Analysis completed");
                Ok(analysis)
            }
            Err(err) if err.is_authentication_failure() => {
                tracing::warn!(
                    error = %err,
                    template = demo::classify(&report.description).name,
                    "API error detected, falling back to demo mode"
                );
                Ok(Self::demo_response(report))
            }
            Err(err) => {
                let api_error = ApiError::from(err);
                tracing::error!(status = %api_error.status_code(), error = %api_error, "Analysis failed");
                Err(api_error)
            }
        }
    }

    fn demo_response(report: &FailureReport) -> FailureAnalysis {
        demo::generate_demo_response(
            &report.description,
            report.effort_or_default(),
            report.preparation_hours_or_default(),
            report.confidence_or_default(),
        )
    }
}
