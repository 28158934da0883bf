// failure-analysis-rs/src/llm_client.rs
//
// HTTP Client for interacting with LLM providers (OpenAI-compatible API)
//
// This module provides:
// - Single-shot chat completion calls via reqwest
// - Classification of provider failures by HTTP status and transport cause
// - Unauthenticated operation when no usable credential is configured
//
// Configuration comes from config_rs::AnalysisConfig:
// - OPENROUTER_API_KEY: API key for the provider (placeholder means "unset")
// - OPENROUTER_API_URL: API endpoint URL (defaults to OpenRouter)
// - OPENROUTER_MODEL: Model to use (e.g. "mistralai/mixtral-8x7b-instruct")
// - ANALYSIS_LLM_TIMEOUT_SECS: request timeout
// - ANALYSIS_LLM_MAX_TOKENS: completion token cap

use config_rs::AnalysisConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

// Custom error type for LLM client operations
// Status-derived variants carry the numeric code in their rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LLMError {
    InvalidRequest(u16, String), // 400, 403, 404 and other client-side statuses
    Unauthorized(String),        // 401 - missing or rejected credential
    RateLimitExceeded(String),   // 429
    ServerError(u16, String),    // 5xx from the provider
    NetworkError(String),        // Connection issues, timeouts, body read failures
    ParseError(String),          // Completion envelope did not decode
}

impl fmt::Display for LLMError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LLMError::InvalidRequest(status, msg) => {
                write!(f, "Invalid request (status code {}): {}", status, msg)
            }
            LLMError::Unauthorized(msg) => write!(f, "Unauthorized (status code 401): {}", msg),
            LLMError::RateLimitExceeded(msg) => {
                write!(f, "Rate limit exceeded (status code 429): {}", msg)
            }
            LLMError::ServerError(status, msg) => {
                write!(f, "Provider error (status code {}): {}", status, msg)
            }
            LLMError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            LLMError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for LLMError {}

/// Map a non-success provider status to an error
fn classify_status(status: u16, body: String) -> LLMError {
    match status {
        401 => LLMError::Unauthorized(body),
        429 => LLMError::RateLimitExceeded(body),
        500..=599 => LLMError::ServerError(status, body),
        _ => LLMError::InvalidRequest(status, body),
    }
}

#[derive(Debug)]
pub struct LLMClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    max_tokens: u32,
    provider: String,
}

impl LLMClient {
    /// Creates a new LLMClient from the process configuration
    ///
    /// A missing or placeholder credential leaves the client unauthenticated:
    /// requests go out without an `Authorization` header and the provider
    /// answers 401.
    pub fn new(config: &AnalysisConfig) -> Result<Self, LLMError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LLMError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        let provider = Self::determine_provider(&config.api_url, &config.model);
        let api_key = config.effective_api_key().map(str::to_string);

        if api_key.is_none() {
            tracing::warn!(
                provider = %provider,
                "No usable API key configured; provider requests will be unauthenticated"
            );
        }

        Ok(Self {
            client,
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            provider,
        })
    }

    /// Determine the LLM provider based on API URL and model
    fn determine_provider(api_url: &str, model: &str) -> String {
        if api_url.contains("openrouter.ai") {
            "openrouter".to_string()
        } else if api_url.contains("openai.com") {
            "openai".to_string()
        } else if api_url.contains("localhost:11434") {
            "ollama".to_string()
        } else if model.starts_with("anthropic/") {
            "anthropic".to_string()
        } else {
            "default".to_string()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    #[cfg(test)]
    fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one chat completion request and return the first choice's content
    ///
    /// # Returns
    /// * `Ok(String)` - The model's reply text
    /// * `Err(LLMError)` - Categorized error on failure
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LLMError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: Some(0.3),
            max_tokens: Some(self.max_tokens),
            response_format: ResponseFormat { kind: "json_object" },
        };

        tracing::debug!(
            api_url = %self.api_url,
            model = %self.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let mut request = self.client.post(&self.api_url).json(&request_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                LLMError::NetworkError(format!("Request timed out: {}", err))
            } else if err.is_connect() {
                LLMError::NetworkError(format!("Connection failed: {}", err))
            } else {
                LLMError::NetworkError(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), text));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| LLMError::NetworkError(format!("Failed to read response body: {}", err)))?;

        let data: ChatCompletionResponse = serde_json::from_slice(&body)
            .map_err(|err| LLMError::ParseError(format!("Failed to parse response: {}", err)))?;

        if let Some(usage) = &data.usage {
            tracing::info!(total_tokens = usage.total_tokens, "LLM request completed");
        }

        data.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LLMError::ParseError("No choices returned in response".to_string()))
    }
}
