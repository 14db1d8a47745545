use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::analyze::request::{AnalysisRequest, Upload};
use crate::state::AppState;

/// Largest accepted multipart body.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const HOME_PAGE: &str = r#"<html>
<head><title>Data Analytics API</title></head>
<body>
  <h1>Data Analytics API</h1>
  <p>POST a multipart form to <code>/analyze</code>.</p>
  <ul>
    <li>Direct question: <code>curl -X POST http://localhost:8000/analyze -F "question=What is 2+2?"</code></li>
    <li>With data: <code>curl -X POST http://localhost:8000/analyze -F "questions=@questions.txt" -F "data=@dataset.csv"</code></li>
    <li>Scraping: <code>curl -X POST http://localhost:8000/analyze -F "question=Summarise https://example.com"</code></li>
  </ul>
</body>
</html>"#;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/analyze", get(analyze_usage).post(analyze))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

async fn analyze_usage() -> Html<&'static str> {
    Html("<p>This endpoint requires POST with multipart form data. See <a href=\"/\">/</a>.</p>")
}

/// Always answers 200 with a JSON body; failures become `{"error": ...}`.
async fn analyze(State(state): State<AppState>, multipart: Multipart) -> Json<Value> {
    let request = match read_request(multipart).await {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Rejected analysis request");
            return Json(json!({ "error": format!("{:#}", e) }));
        }
    };

    // Run on its own task so a panic inside a flow is contained to this request.
    let analyzer = state.analyzer.clone();
    let outcome = tokio::spawn(async move { analyzer.analyze(&request).await }).await;

    match outcome {
        Ok(body) => Json(body),
        Err(e) => {
            error!(error = %e, "Analysis task aborted");
            Json(json!({ "error": e.to_string() }))
        }
    }
}

/// Collect the `question` text field and every file field.
async fn read_request(mut multipart: Multipart) -> Result<AnalysisRequest> {
    let mut question = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .context("Malformed multipart body")?
    {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_string);

        match file_name {
            Some(file_name) if !file_name.is_empty() => {
                let bytes = field
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read upload `{}`", file_name))?;
                uploads.push(Upload {
                    field: name,
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            _ if name == "question" => {
                question = field.text().await.context("Failed to read question")?;
            }
            _ => {}
        }
    }

    Ok(AnalysisRequest::from_uploads(question, uploads))
}
