use indexmap::IndexMap;
use tracing::{debug, info};

use super::request::DataContent;

/// 1-indexed, inclusive line span of the question document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Slice `document` to this range, clamped to the lines that exist.
    pub fn select(&self, document: &str) -> String {
        let lines: Vec<&str> = document.split('\n').collect();
        let start = self.start.saturating_sub(1).min(lines.len());
        let end = self.end.min(lines.len()).max(start);
        lines[start..end].join("\n")
    }
}

/// Maps one dataset shape to the block of questions about it.
#[derive(Debug, Clone)]
pub struct DatasetRule {
    pub kind: &'static str,
    pub range: LineRange,
    /// Known upload names, matched as substrings in either direction.
    pub file_names: &'static [&'static str],
    /// Case-insensitive content signals, checked when no name matches.
    pub keywords: &'static [&'static str],
}

impl DatasetRule {
    /// An empty name never matches, even though it is a substring of every
    /// known name.
    fn matches_name(&self, uploaded: &str) -> bool {
        let lowered = uploaded.to_lowercase();
        let uploaded = strip_csv(&lowered);
        if uploaded.is_empty() {
            return false;
        }
        self.file_names.iter().any(|known| {
            let known = strip_csv(known);
            uploaded.contains(known) || known.contains(uploaded)
        })
    }

    fn matches_content(&self, content_lower: &str) -> bool {
        self.keywords.iter().any(|k| content_lower.contains(k))
    }
}

fn strip_csv(name: &str) -> &str {
    name.strip_suffix(".csv").unwrap_or(name)
}

/// Questions narrowed to the uploaded dataset, or the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevantQuestionSubset {
    /// `None` when no rule matched and `text` is the full document.
    pub range: Option<LineRange>,
    pub text: String,
}

/// Ordered rule table; the first rule that matches wins.
///
/// Only recognises the shapes it has rules for. Unknown datasets get the
/// whole question document.
#[derive(Debug, Clone)]
pub struct QuestionSelector {
    rules: Vec<DatasetRule>,
}

impl Default for QuestionSelector {
    fn default() -> Self {
        Self::new(vec![
                DatasetRule {
                    kind: "sales",
                    range: LineRange::new(1, 21),
                    file_names: &["sample-sales.csv", "sales-data.csv"],
                    keywords: &["sales", "region"],
                },
                DatasetRule {
                    kind: "network",
                    range: LineRange::new(22, 43),
                    file_names: &["edges.csv"],
                    keywords: &["alice", "bob", "node"],
                },
                DatasetRule {
                    kind: "weather",
                    range: LineRange::new(44, 64),
                    file_names: &["sample-weather.csv"],
                    keywords: &["temperature", "precipitation", "weather"],
                },
        ])
    }
}

impl QuestionSelector {
    pub fn new(rules: Vec<DatasetRule>) -> Self {
        Self { rules }
    }

    /// Pick the question lines that apply to `data_files`: upload names first,
    /// then text content.
    pub fn extract_relevant(
        &self,
        document: &str,
        data_files: &IndexMap<String, DataContent>,
    ) -> RelevantQuestionSubset {
        if document.is_empty() {
            return Self::full(document);
        }

        if let Some(rule) = self.match_by_name(data_files) {
            info!(kind = rule.kind, range = ?rule.range, "Questions selected by file name");
            return Self::subset(rule, document);
        }

        if let Some(rule) = self.match_by_content(data_files) {
            info!(kind = rule.kind, range = ?rule.range, "Questions selected by file content");
            return Self::subset(rule, document);
        }

        debug!(files = data_files.len(), "No dataset rule matched, keeping all questions");
        Self::full(document)
    }

    fn match_by_name(&self, data_files: &IndexMap<String, DataContent>) -> Option<&DatasetRule> {
        data_files
            .keys()
            .find_map(|name| self.rules.iter().find(|rule| rule.matches_name(name)))
    }

    fn match_by_content(
        &self,
        data_files: &IndexMap<String, DataContent>,
    ) -> Option<&DatasetRule> {
        data_files.values().find_map(|content| {
            let lower = content.as_text()?.to_lowercase();
            self.rules.iter().find(|rule| rule.matches_content(&lower))
        })
    }

    fn subset(rule: &DatasetRule, document: &str) -> RelevantQuestionSubset {
        RelevantQuestionSubset {
            range: Some(rule.range),
            text: rule.range.select(document),
        }
    }

    fn full(document: &str) -> RelevantQuestionSubset {
        RelevantQuestionSubset {
            range: None,
            text: document.to_string(),
        }
    }
}
