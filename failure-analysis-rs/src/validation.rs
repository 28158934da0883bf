//! Analysis Request Validation
//!
//! Checks the `POST /analyze` payload before any responder runs: content
//! type, JSON syntax and the FailureReport schema. Every failure maps to
//! 422 with a FastAPI-style `{"detail": [...]}` body.

use axum::body::{to_bytes, Body};
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};

/// Maximum request payload size (1MB)
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Minimum description length in characters
pub const MIN_DESCRIPTION_CHARS: u64 = 20;

/// Schema for the analyze request
pub static FAILURE_REPORT_SCHEMA: Lazy<JSONSchema> = Lazy::new(|| {
    let schema = json!({
        "type": "object",
        "required": ["description"],
        "properties": {
            "description": {
                "type": "string",
                "minLength": MIN_DESCRIPTION_CHARS
            },
            "effort_level": {
                "type": ["integer", "null"],
                "minimum": 0,
                "maximum": 10
            },
            "preparation_hours": {
                "type": ["integer", "null"],
                "minimum": 0
            },
            "confidence_before": {
                "type": ["integer", "null"],
                "minimum": 0,
                "maximum": 10
            }
        }
    });

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .expect("Invalid schema")
});

/// One offending location in a rejected payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub loc: String,
    pub msg: String,
}

/// Error response for validation failures
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub detail: Vec<ValidationIssue>,
}

/// Validation error for API requests
#[derive(Debug, thiserror::Error)]
pub enum ApiValidationError {
    #[error("Invalid request format: {0}")]
    InvalidFormat(String),

    #[error("Content type must be {0}")]
    ContentType(String),

    #[error("Request payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Schema validation error")]
    Schema(Vec<ValidationIssue>),
}

impl ApiValidationError {
    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ValidationErrorResponse>) {
        let status = match self {
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let detail = match self {
            Self::Schema(issues) => issues.clone(),
            other => vec![ValidationIssue {
                loc: "body".to_string(),
                msg: other.to_string(),
            }],
        };

        (status, Json(ValidationErrorResponse { detail }))
    }
}

impl IntoResponse for ApiValidationError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}

impl From<JsonRejection> for ApiValidationError {
    fn from(rejection: JsonRejection) -> Self {
        ApiValidationError::InvalidFormat(rejection.body_text())
    }
}

/// Validate the Content-Type header
pub fn validate_content_type(headers: &HeaderMap, expected: &str) -> Result<(), ApiValidationError> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !content_type.starts_with(expected) {
        return Err(ApiValidationError::ContentType(format!(
            "Expected content type '{}', got '{}'",
            expected, content_type
        )));
    }

    Ok(())
}

/// Validate a parsed payload against the FailureReport schema
pub fn validate_failure_report(json: &Value) -> Result<(), ApiValidationError> {
    if let Err(errors) = FAILURE_REPORT_SCHEMA.validate(json) {
        let issues: Vec<ValidationIssue> = errors
            .map(|err| {
                let pointer = err.instance_path.to_string();
                ValidationIssue {
                    loc: if pointer.is_empty() { "body".to_string() } else { format!("body{}", pointer) },
                    msg: err.to_string(),
                }
            })
            .collect();

        return Err(ApiValidationError::Schema(issues));
    }

    Ok(())
}

/// Parse raw request bytes as JSON
pub fn parse_json_body(bytes: &[u8]) -> Result<Value, ApiValidationError> {
    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(ApiValidationError::PayloadTooLarge(format!(
            "Payload size ({} bytes) exceeds maximum allowed size ({} bytes)",
            bytes.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    serde_json::from_slice::<Value>(bytes)
        .map_err(|e| ApiValidationError::InvalidFormat(format!("Invalid JSON: {}", e)))
}

/// Generate middleware config for payload limits
pub fn payload_limit_config() -> tower_http::limit::RequestBodyLimitLayer {
    tower_http::limit::RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE)
}

/// Middleware validating analyze requests before they reach the handler.
///
/// The body is buffered, checked, and handed on unchanged.
pub async fn validate_request_middleware(
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiValidationError> {
    if req.method() != Method::POST || req.uri().path() != "/analyze" {
        return Ok(next.run(req).await);
    }

    validate_content_type(req.headers(), "application/json")?;

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_PAYLOAD_SIZE).await.map_err(|e| {
        ApiValidationError::PayloadTooLarge(format!("Failed to read request body: {}", e))
    })?;

    let payload = parse_json_body(&bytes)?;
    validate_failure_report(&payload)?;

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_validate_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json; charset=utf-8"));

        assert!(validate_content_type(&headers, "application/json").is_ok());
        assert!(validate_content_type(&headers, "application/xml").is_err());
        assert!(validate_content_type(&HeaderMap::new(), "application/json").is_err());
    }

    #[test]
    fn test_valid_reports() {
        assert!(validate_failure_report(&json!({
            "description": "I failed my final exam after months of study"
        }))
        .is_ok());

        assert!(validate_failure_report(&json!({
            "description": "I failed my final exam after months of study",
            "effort_level": 0,
            "preparation_hours": 120,
            "confidence_before": 10
        }))
        .is_ok());

        assert!(validate_failure_report(&json!({
            "description": "I failed my final exam after months of study",
            "effort_level": null
        }))
        .is_ok());
    }

    #[test]
    fn test_short_description_rejected() {
        let err = validate_failure_report(&json!({ "description": "I failed" })).unwrap_err();
        match err {
            ApiValidationError::Schema(issues) => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].loc.ends_with("description"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_signals_rejected() {
        let base = "I failed my final exam after months of study";
        assert!(validate_failure_report(&json!({ "description": base, "effort_level": 11 })).is_err());
        assert!(validate_failure_report(&json!({ "description": base, "confidence_before": -1 })).is_err());
        assert!(validate_failure_report(&json!({ "description": base, "preparation_hours": -5 })).is_err());
        assert!(validate_failure_report(&json!({ "description": base, "effort_level": "high" })).is_err());
        assert!(validate_failure_report(&json!({ "effort_level": 3 })).is_err());
    }

    #[test]
    fn test_parse_json_body() {
        assert!(parse_json_body(br#"{"description": "x"}"#).is_ok());
        assert!(matches!(
            parse_json_body(b"{not json"),
            Err(ApiValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_error_statuses() {
        let (status, _) = ApiValidationError::InvalidFormat("bad".into()).to_response();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = ApiValidationError::PayloadTooLarge("big".into()).to_response();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
