use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::extract;
use super::prompts;
use super::request::DataContent;
use crate::llm::{LanguageModel, LlmError};
use crate::retry::RetryPolicy;
use crate::scrape::types::ScrapeResult;
use crate::scrape::urls::detect_urls;
use crate::scrape::WebScraper;
use crate::state::Settings;

/// Returned in place of an answer when every attempt was rate limited.
pub const RATE_LIMIT_FALLBACK: &str = r#"{"error": "Rate limit exceeded", "answers": ["Unable to process due to rate limits", "Please try again later", "API quota exceeded", "Service temporarily unavailable"]}"#;

/// Scrape-flow failures reported to the caller as `{"error": ...}`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("No URLs found in question")]
    NoUrls,

    #[error("Failed to scrape any URLs. Errors: {}", .0.join("; "))]
    NoScrapableContent(Vec<String>),
}

/// Outcome of the advisory validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(String),
}

/// Models and token budgets per call site.
#[derive(Debug, Clone)]
pub struct CallBudgets {
    pub analysis_model: String,
    pub fast_model: String,
    pub scrape_max_tokens: u32,
    pub direct_max_tokens: u32,
    pub validation_max_tokens: u32,
}

pub struct LlmOrchestrator {
    llm: Arc<dyn LanguageModel>,
    scraper: WebScraper,
    retry: RetryPolicy,
    budgets: CallBudgets,
}

impl LlmOrchestrator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        scraper: WebScraper,
        retry: RetryPolicy,
        budgets: CallBudgets,
    ) -> Self {
        Self {
            llm,
            scraper,
            retry,
            budgets,
        }
    }

    pub fn from_settings(
        llm: Arc<dyn LanguageModel>,
        scraper: WebScraper,
        settings: &Settings,
    ) -> Self {
        Self::new(
            llm,
            scraper,
            RetryPolicy::new(settings.max_attempts, settings.llm_base_delay),
            CallBudgets {
                analysis_model: settings.analysis_model.clone(),
                fast_model: settings.fast_model.clone(),
                scrape_max_tokens: settings.scrape_max_tokens,
                direct_max_tokens: settings.direct_max_tokens,
                validation_max_tokens: settings.validation_max_tokens,
            },
        )
    }

    /// One model call. Never fails: rate-limit exhaustion yields
    /// [`RATE_LIMIT_FALLBACK`], any other error an `LLM Error: ...` string.
    pub async fn call(&self, prompt: &str, max_tokens: u32, model: &str) -> String {
        let outcome = self
            .retry
            .run(
                model,
                |_| self.llm.generate(prompt, max_tokens, model),
                LlmError::is_rate_limited,
            )
            .await;

        match outcome {
            Ok(text) => text,
            Err(LlmError::RateLimited(e)) => {
                warn!(model, error = %e, "Rate limit persisted, returning fallback payload");
                RATE_LIMIT_FALLBACK.to_string()
            }
            Err(LlmError::Other(e)) => {
                warn!(model, error = %e, "LLM call failed");
                format!("LLM Error: {}", e)
            }
        }
    }

    /// Scrape every URL in the question, in order, then analyse the pages.
    /// Fails only when no URL could be scraped at all.
    pub async fn scrape_and_analyze(&self, question: &str) -> Result<Value, FlowError> {
        let urls = detect_urls(question);
        if urls.is_empty() {
            return Err(FlowError::NoUrls);
        }

        let mut pages: Vec<ScrapeResult> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        for url in &urls {
            match self.scraper.scrape(url).await {
                Ok(page) => pages.push(page),
                Err(e) => {
                    warn!(url = %url, error = %format!("{:#}", e), "Giving up on URL");
                    errors.push(format!("Failed to scrape {}: {:#}", url, e));
                }
            }
        }

        if pages.is_empty() {
            return Err(FlowError::NoScrapableContent(errors));
        }

        let scraped_json = serde_json::to_string_pretty(&pages).unwrap_or_else(|_| "[]".into());
        let prompt = prompts::scrape_analysis(question, &scraped_json, &errors);

        info!(pages = pages.len(), failed = errors.len(), "Sending scraped data for analysis");
        let raw = self
            .call(&prompt, self.budgets.scrape_max_tokens, &self.budgets.fast_model)
            .await;

        let Some(candidate) = extract::balanced_object(&raw) else {
            debug!("No JSON object in analysis response");
            return Ok(json!({ "result": raw }));
        };

        let answer: Value = match serde_json::from_str(candidate) {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Analysis response is not valid JSON");
                return Ok(extract::passthrough(&raw, e));
            }
        };

        // Advisory only: the verdict is logged and never touches `answer`.
        match self.validate(question, &answer).await {
            Verdict::Passed => info!("Validation passed"),
            Verdict::Failed(reason) => warn!(reason = %reason, "Validation failed"),
        }

        Ok(answer)
    }

    /// Ask the model whether `answer` fully and correctly covers `question`.
    pub async fn validate(&self, question: &str, answer: &Value) -> Verdict {
        let answer_json = serde_json::to_string_pretty(answer).unwrap_or_default();
        let prompt = prompts::validation(question, &answer_json);
        let response = self
            .call(&prompt, self.budgets.validation_max_tokens, &self.budgets.fast_model)
            .await;

        if response.contains(prompts::VALIDATION_PASSED) {
            Verdict::Passed
        } else {
            Verdict::Failed(response.trim().to_string())
        }
    }

    /// Single-pass analysis of the question and uploaded data, expecting a
    /// flat JSON object back.
    pub async fn direct_analysis(
        &self,
        question: &str,
        data_files: &IndexMap<String, DataContent>,
    ) -> Value {
        let names: Vec<&String> = data_files.keys().collect();
        let file_names = serde_json::to_string(&names).unwrap_or_else(|_| "[]".into());
        let file_contents = (!data_files.is_empty()).then(|| {
            let map: IndexMap<&String, String> = data_files
                .iter()
                .map(|(name, content)| (name, content.to_prompt_text()))
                .collect();
            serde_json::to_string_pretty(&map).unwrap_or_default()
        });

        let prompt = prompts::direct_analysis(question, &file_names, file_contents.as_deref());
        info!(files = data_files.len(), "Running direct analysis");
        let raw = self
            .call(&prompt, self.budgets.direct_max_tokens, &self.budgets.analysis_model)
            .await;

        let Some(candidate) = extract::first_to_last_brace(&raw) else {
            warn!("No JSON object in direct analysis response");
            return extract::passthrough(raw.trim(), "no JSON object found in model response");
        };

        match serde_json::from_str::<Value>(&extract::strip_escaped_newlines(candidate)) {
            Ok(answer) => {
                if !extract::is_flat(&answer) {
                    warn!("Direct analysis answer contains nested values");
                }
                answer
            }
            Err(e) => {
                warn!(error = %e, "Direct analysis response is not valid JSON");
                extract::passthrough(raw.trim(), e)
            }
        }
    }
}
