use serde::{Deserialize, Serialize};

/// Structured content pulled from one web page.
///
/// Field names on the wire match what the analysis prompt describes to the
/// model (`url`, `title`, `text_content`, `tables`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeResult {
    #[serde(rename = "url")]
    pub source_url: String,
    /// Empty when the page has no `<title>`.
    #[serde(rename = "title")]
    pub page_title: String,
    /// Visible text, capped at the configured body limit (in chars).
    #[serde(rename = "text_content")]
    pub body_text: String,
    /// At most the configured table limit, in document order.
    pub tables: Vec<TableData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableData {
    /// Position of the table among the first N tables on the page.
    #[serde(rename = "table_index")]
    pub index: usize,
    /// Rows with at least one non-empty cell.
    #[serde(rename = "data")]
    pub rows: Vec<Vec<String>>,
}
