mod analyze;
mod llm;
#[cfg(test)]
mod mock;
mod retry;
mod scrape;
mod server;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, Level};

use analyze::Analyzer;
use llm::LlmClient;
use scrape::ReqwestFetcher;
use state::{AppState, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Load env
    let _ = dotenv::dotenv();
    let settings = Settings::from_env();

    // Init LLM client
    let llm_client = Arc::new(LlmClient::from_env()?);
    info!(
        model = %settings.analysis_model,
        fast_model = %settings.fast_model,
        "LLM client initialized"
    );

    let fetcher = Arc::new(ReqwestFetcher::new(settings.scrape_timeout)?);
    let analyzer = Arc::new(Analyzer::from_settings(llm_client, fetcher, &settings));
    let app = server::router(AppState { analyzer });

    let addr = format!("{}:{}", settings.bind_addr, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Data analytics API listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
