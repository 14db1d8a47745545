use std::sync::Arc;
use std::time::Duration;

use crate::analyze::Analyzer;

/// Tunable pipeline parameters. Defaults match production behaviour; models
/// and the listen address can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_attempts: u32,
    pub scrape_base_delay: Duration,
    pub llm_base_delay: Duration,
    pub scrape_timeout: Duration,
    pub max_body_chars: usize,
    pub max_tables: usize,
    pub analysis_model: String,
    pub fast_model: String,
    pub scrape_max_tokens: u32,
    pub direct_max_tokens: u32,
    pub validation_max_tokens: u32,
    pub bind_addr: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            scrape_base_delay: Duration::from_secs(1),
            llm_base_delay: Duration::from_secs(10),
            scrape_timeout: Duration::from_secs(30),
            max_body_chars: 30_000,
            max_tables: 5,
            analysis_model: "qwen/qwen3-8b".to_string(),
            fast_model: "qwen/qwen3-8b".to_string(),
            scrape_max_tokens: 8000,
            direct_max_tokens: 6000,
            validation_max_tokens: 500,
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let analysis_model = dotenv::var("LLM_MODEL").unwrap_or(defaults.analysis_model);
        let fast_model =
            dotenv::var("LLM_FAST_MODEL").unwrap_or_else(|_| analysis_model.clone());
        let bind_addr = dotenv::var("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = dotenv::var("PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(defaults.port);

        Self {
            analysis_model,
            fast_model,
            bind_addr,
            port,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}
