//! Scripted stand-ins for the external capabilities, used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::{LanguageModel, LlmError};
use crate::scrape::{FetchedPage, PageFetcher};

/// Replays queued responses in order; once drained, every call fails.
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<FetchedPage>>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<Result<FetchedPage>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn page(body: &str) -> Result<FetchedPage> {
        Ok(FetchedPage {
            status: 200,
            body: body.to_string(),
        })
    }

    pub fn status(status: u16) -> Result<FetchedPage> {
        Ok(FetchedPage {
            status,
            body: String::new(),
        })
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn get(&self, url: &str) -> Result<FetchedPage> {
        self.urls.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted response for {}", url)))
    }
}

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub prompt: String,
    pub max_tokens: u32,
    pub model: String,
}

/// Replays queued model outcomes in order; once drained, every call fails.
pub struct ScriptedModel {
    outcomes: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedModel {
    pub fn new(outcomes: Vec<Result<String, LlmError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn rate_limited() -> Result<String, LlmError> {
        Err(LlmError::RateLimited("HTTP 429 Too Many Requests".to_string()))
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        model: &str,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(ModelCall {
            prompt: prompt.to_string(),
            max_tokens,
            model: model.to_string(),
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Other("no scripted outcome".to_string())))
    }
}
