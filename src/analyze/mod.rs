pub mod extract;
pub mod orchestrator;
pub mod prompts;
pub mod questions;
pub mod request;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::llm::LanguageModel;
use crate::retry::RetryPolicy;
use crate::scrape::html::PageLimits;
use crate::scrape::urls::detect_urls;
use crate::scrape::{PageFetcher, WebScraper};
use crate::state::Settings;

use orchestrator::LlmOrchestrator;
use questions::QuestionSelector;
use request::AnalysisRequest;

/// Processing strategy for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    ScrapeAndAnalyze { urls: Vec<String> },
    DirectAnalysis,
}

/// Scrape only when the question links somewhere and nothing was uploaded.
pub fn select_flow(question: &str, request: &AnalysisRequest) -> Flow {
    let urls = detect_urls(question);
    if !urls.is_empty() && !request.has_data_files() {
        Flow::ScrapeAndAnalyze { urls }
    } else {
        Flow::DirectAnalysis
    }
}

pub struct Analyzer {
    orchestrator: LlmOrchestrator,
    selector: QuestionSelector,
}

impl Analyzer {
    pub fn new(orchestrator: LlmOrchestrator, selector: QuestionSelector) -> Self {
        Self {
            orchestrator,
            selector,
        }
    }

    pub fn from_settings(
        llm: Arc<dyn LanguageModel>,
        fetcher: Arc<dyn PageFetcher>,
        settings: &Settings,
    ) -> Self {
        let scraper = WebScraper::new(
            fetcher,
            RetryPolicy::new(settings.max_attempts, settings.scrape_base_delay),
            PageLimits {
                max_body_chars: settings.max_body_chars,
                max_tables: settings.max_tables,
            },
        );
        let orchestrator = LlmOrchestrator::from_settings(llm, scraper, settings);
        Self::new(orchestrator, QuestionSelector::default())
    }

    /// The question to work on: narrowed to the uploaded dataset when both a
    /// question document and data files are present. An empty document falls
    /// back to the question text before narrowing.
    pub fn effective_question(&self, request: &AnalysisRequest) -> String {
        if request.question_document().is_some() && request.has_data_files() {
            self.selector
                .extract_relevant(request.question(), request.data_files())
                .text
        } else {
            request.question().to_string()
        }
    }

    /// Route the request to one flow and shape its outcome as the response body.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Value {
        let question = self.effective_question(request);

        match select_flow(&question, request) {
            Flow::ScrapeAndAnalyze { urls } => {
                info!(?urls, "Routing to scrape-and-analyze");
                match self.orchestrator.scrape_and_analyze(&question).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!(error = %e, "Scrape-and-analyze failed");
                        json!({ "error": e.to_string() })
                    }
                }
            }
            Flow::DirectAnalysis => {
                info!(
                    files = request.data_files().len(),
                    "Routing to direct analysis"
                );
                self.orchestrator
                    .direct_analysis(&question, request.data_files())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ScriptedFetcher, ScriptedModel};
    use super::request::Upload;

    fn analyzer(model: Arc<ScriptedModel>, fetcher: Arc<ScriptedFetcher>) -> Analyzer {
        Analyzer::from_settings(model, fetcher, &Settings::default())
    }

    fn upload(field: &str, bytes: &str) -> Upload {
        Upload {
            field: field.to_string(),
            file_name: format!("{}.txt", field),
            bytes: bytes.as_bytes().to_vec(),
        }
    }

    fn question_doc() -> String {
        (1..=64)
            .map(|i| format!("Q{}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_select_flow() {
        let bare = AnalysisRequest::from_uploads("", vec![]);
        assert_eq!(
            select_flow("Summarise https://a.example/x", &bare),
            Flow::ScrapeAndAnalyze {
                urls: vec!["https://a.example/x".to_string()]
            }
        );
        assert_eq!(select_flow("What is 2+2?", &bare), Flow::DirectAnalysis);

        let with_data = AnalysisRequest::from_uploads("", vec![upload("data", "a,b")]);
        assert_eq!(
            select_flow("Summarise https://a.example/x", &with_data),
            Flow::DirectAnalysis
        );
    }

    #[test]
    fn test_effective_question_narrows_with_data() {
        let a = analyzer(Arc::new(ScriptedModel::replies(&[])), Arc::new(ScriptedFetcher::new(vec![])));

        let req = AnalysisRequest::from_uploads(
            "",
            vec![upload("questions", &question_doc()), upload("edges.csv", "a,b")],
        );
        let q = a.effective_question(&req);
        assert!(q.starts_with("Q22\n"));
        assert!(q.ends_with("\nQ43"));

        // no data files: full document, untouched
        let doc_only = AnalysisRequest::from_uploads("", vec![upload("questions", &question_doc())]);
        assert_eq!(a.effective_question(&doc_only), question_doc());
    }

    #[test]
    fn test_empty_question_document_with_data_keeps_question_text() {
        let a = analyzer(Arc::new(ScriptedModel::replies(&[])), Arc::new(ScriptedFetcher::new(vec![])));

        let req = AnalysisRequest::from_uploads(
            "What is the total of column b?",
            vec![upload("questions", ""), upload("data", "a,b\n1,2")],
        );
        assert_eq!(a.effective_question(&req), "What is the total of column b?");
    }

    #[tokio::test]
    async fn test_empty_question_document_with_data_reaches_prompt() {
        let model = Arc::new(ScriptedModel::replies(&["{\"total\": 2}"]));
        let a = analyzer(model.clone(), Arc::new(ScriptedFetcher::new(vec![])));

        let req = AnalysisRequest::from_uploads(
            "What is the total of column b?",
            vec![upload("questions", ""), upload("data", "a,b\n1,2")],
        );
        assert_eq!(a.analyze(&req).await, json!({"total": 2}));
        assert!(model.calls()[0].prompt.contains("What is the total of column b?"));
    }

    #[tokio::test]
    async fn test_direct_route() {
        let model = Arc::new(ScriptedModel::replies(&["{\"answer\": 4}"]));
        let a = analyzer(model.clone(), Arc::new(ScriptedFetcher::new(vec![])));

        let answer = a.analyze(&AnalysisRequest::from_uploads("What is 2+2?", vec![])).await;

        assert_eq!(answer, json!({"answer": 4}));
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_url_with_data_files_goes_direct() {
        let model = Arc::new(ScriptedModel::replies(&["{\"rows\": 1}"]));
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let a = analyzer(model.clone(), fetcher.clone());

        let req = AnalysisRequest::from_uploads(
            "Compare with https://a.example",
            vec![upload("data", "a,b\n1,2")],
        );
        assert_eq!(a.analyze(&req).await, json!({"rows": 1}));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_scrape_failure_is_error_object() {
        let model = Arc::new(ScriptedModel::replies(&[]));
        let a = analyzer(model.clone(), Arc::new(ScriptedFetcher::new(vec![])));

        let answer = a
            .analyze(&AnalysisRequest::from_uploads("Scrape https://gone.example", vec![]))
            .await;

        let msg = answer["error"].as_str().unwrap();
        assert!(msg.starts_with("Failed to scrape any URLs. Errors: Failed to scrape https://gone.example"));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scrape_route_returns_model_answer() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![ScriptedFetcher::page(
            "<title>Cup</title><p>Argentina won the 2022 final.</p>",
        )]));
        let model = Arc::new(ScriptedModel::replies(&[
            "{\"winner\": \"Argentina\"}",
            "VALIDATION_FAILED: no source cited",
        ]));
        let a = analyzer(model.clone(), fetcher);

        let answer = a
            .analyze(&AnalysisRequest::from_uploads(
                "Who won? https://cup.example/2022",
                vec![],
            ))
            .await;

        assert_eq!(answer, json!({"winner": "Argentina"}));
        let calls = model.calls();
        assert!(calls[0].prompt.contains("Argentina won the 2022 final."));
        assert_eq!(calls[0].model, Settings::default().fast_model);
    }
}
