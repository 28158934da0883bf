//! config-rs/lib.rs
//! Shared configuration utilities for the failure analysis service
//! Provides bind address resolution and the provider settings read at startup

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Credential value shipped in sample `.env` files. Treated as "not configured".
pub const PLACEHOLDER_API_KEY: &str = "your_key_here";

/// Model used when `OPENROUTER_MODEL` is unset
pub const DEFAULT_MODEL: &str = "mistralai/mixtral-8x7b-instruct";

/// OpenAI-compatible chat completions endpoint used when `OPENROUTER_API_URL` is unset
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Load a local `.env` file into the process environment, if one exists.
///
/// Must run before any `from_env` call so file values are visible.
pub fn load_env_file() {
    match dotenv::dotenv() {
        Ok(path) => log::info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => log::debug!("No .env file found, using process environment"),
        Err(e) => log::warn!("Failed to read .env file: {}", e),
    }
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "ANALYSIS")
/// * `default_port` - The default port to use if not specified in environment
///
/// # Returns
/// The port number to use for the service
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    env::var(&var_name)
        .unwrap_or_else(|_| default_port.to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        })
}

/// Create a SocketAddr for binding a service
///
/// `{SERVICE}_SERVICE_ADDR` wins when it holds a socket address, optionally
/// prefixed with `http://` or `https://`. Otherwise binds all interfaces on
/// the port from [`get_service_port`].
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Ok(addr_str) = env::var(&var_name) {
        let trimmed = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(&addr_str);
        match trimmed.parse::<SocketAddr>() {
            Ok(addr) => return addr,
            Err(_) => log::warn!("Invalid address format in {}, using default", var_name),
        }
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

// Read an environment variable, falling back on absence or parse failure
fn get_env_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value for {}, using default", name);
            default
        }),
        Err(_) => default,
    }
}

/// Provider settings for the analysis service.
///
/// Read once at startup and shared read-only for the process lifetime. The
/// credential decides whether requests are served by the model provider or by
/// the deterministic demo responder.
#[derive(Clone)]
pub struct AnalysisConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub output_retries: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 60,
            max_tokens: 1500,
            output_retries: 2,
        }
    }
}

impl AnalysisConfig {
    /// Reads:
    /// - OPENROUTER_API_KEY: provider credential (optional)
    /// - OPENROUTER_MODEL: model identifier (default: mistralai/mixtral-8x7b-instruct)
    /// - OPENROUTER_API_URL: chat completions endpoint
    /// - ANALYSIS_LLM_TIMEOUT_SECS: provider request timeout (default: 60)
    /// - ANALYSIS_LLM_MAX_TOKENS: completion token cap (default: 1500)
    /// - ANALYSIS_LLM_OUTPUT_RETRIES: structured output retries (default: 2)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = env::var("OPENROUTER_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let model = env::var("OPENROUTER_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.model);

        let api_url = env::var("OPENROUTER_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(defaults.api_url);

        Self {
            api_key,
            model,
            api_url,
            timeout_secs: get_env_var("ANALYSIS_LLM_TIMEOUT_SECS", defaults.timeout_secs),
            max_tokens: get_env_var("ANALYSIS_LLM_MAX_TOKENS", defaults.max_tokens),
            output_retries: get_env_var("ANALYSIS_LLM_OUTPUT_RETRIES", defaults.output_retries),
        }
    }

    /// The credential to send to the provider, or `None` when it is absent
    /// or still the placeholder.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    /// Demo mode serves every request from the canned responder.
    pub fn is_demo_mode(&self) -> bool {
        self.effective_api_key().is_none()
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("output_retries", &self.output_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_service_port() {
        // Test with environment variable
        std::env::set_var("PORTTEST_SERVICE_PORT", "9000");
        assert_eq!(get_service_port("PORTTEST", 8000), 9000);

        // Test with garbage
        std::env::set_var("PORTTEST_SERVICE_PORT", "not-a-port");
        assert_eq!(get_service_port("PORTTEST", 8000), 8000);

        // Test with default
        std::env::remove_var("UNKNOWN_SERVICE_PORT");
        assert_eq!(get_service_port("UNKNOWN", 8000), 8000);
    }

    #[test]
    fn test_get_bind_address() {
        std::env::set_var("BINDTEST_SERVICE_ADDR", "127.0.0.1:9100");
        assert_eq!(get_bind_address("BINDTEST", 8000), "127.0.0.1:9100".parse().unwrap());

        std::env::set_var("BINDTEST_SERVICE_ADDR", "http://127.0.0.1:9101");
        assert_eq!(get_bind_address("BINDTEST", 8000), "127.0.0.1:9101".parse().unwrap());

        std::env::remove_var("BINDTEST_SERVICE_ADDR");
        std::env::remove_var("BINDTEST_SERVICE_PORT");
        assert_eq!(get_bind_address("BINDTEST", 8000), "0.0.0.0:8000".parse().unwrap());
    }

    #[test]
    fn test_demo_mode_detection() {
        let mut config = AnalysisConfig::default();
        assert!(config.is_demo_mode());

        config.api_key = Some(PLACEHOLDER_API_KEY.to_string());
        assert!(config.is_demo_mode());
        assert_eq!(config.effective_api_key(), None);

        config.api_key = Some("sk-or-real".to_string());
        assert!(!config.is_demo_mode());
        assert_eq!(config.effective_api_key(), Some("sk-or-real"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = AnalysisConfig {
            api_key: Some("sk-or-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-or-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.output_retries, 2);
    }
}
