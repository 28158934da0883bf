// failure-analysis-rs/src/main.rs
// Main Entry Point for failure-analysis-rs
// Serves the Explain My Failure HTTP API

use std::sync::Arc;

use config_rs::AnalysisConfig;
use failure_analysis::AnalysisService;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file before anything reads the environment
    config_rs::load_env_file();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AnalysisConfig::from_env();
    if config.is_demo_mode() {
        tracing::warn!("OPENROUTER_API_KEY not set; every request will be served in demo mode");
    }
    tracing::info!(?config, "Loaded analysis configuration");

    let service = Arc::new(AnalysisService::from_config(config)?);
    let app = service.create_router();

    let addr = config_rs::get_bind_address("ANALYSIS", 8000);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("{} v{} listening on {}", failure_analysis::SERVICE_NAME, failure_analysis::SERVICE_VERSION, addr);

    axum::serve(listener, app).await?;

    Ok(())
}
