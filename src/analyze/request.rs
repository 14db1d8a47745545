use indexmap::IndexMap;

/// Form field that carries the question document rather than data.
pub const QUESTIONS_FIELD: &str = "questions";

/// Contents of one uploaded data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataContent {
    Text(String),
    /// Not valid UTF-8; only the size is forwarded to the model.
    Binary { file_name: String, len: usize },
}

impl DataContent {
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => DataContent::Text(text),
            Err(e) => DataContent::Binary {
                file_name: file_name.to_string(),
                len: e.into_bytes().len(),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataContent::Text(text) => Some(text),
            DataContent::Binary { .. } => None,
        }
    }

    /// The form the content takes inside a prompt.
    pub fn to_prompt_text(&self) -> String {
        match self {
            DataContent::Text(text) => text.clone(),
            DataContent::Binary { file_name, len } => {
                format!("Binary file: {} ({} bytes)", file_name, len)
            }
        }
    }
}

/// A file as received from the front-end.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One inbound analysis call. Built once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    question_text: String,
    question_document: Option<String>,
    data_files: IndexMap<String, DataContent>,
}

impl AnalysisRequest {
    pub fn new(
        question_text: impl Into<String>,
        question_document: Option<String>,
        data_files: IndexMap<String, DataContent>,
    ) -> Self {
        Self {
            question_text: question_text.into(),
            question_document,
            data_files,
        }
    }

    /// Split uploads into the question document (field `questions`) and data
    /// files keyed by field name. A repeated field keeps its first position
    /// and its last content.
    pub fn from_uploads(question_text: impl Into<String>, uploads: Vec<Upload>) -> Self {
        let mut question_document = None;
        let mut data_files = IndexMap::new();

        for upload in uploads {
            let content = DataContent::from_bytes(&upload.file_name, upload.bytes);
            if upload.field == QUESTIONS_FIELD {
                question_document = Some(content.to_prompt_text());
            } else {
                data_files.insert(upload.field, content);
            }
        }

        Self::new(question_text, question_document, data_files)
    }

    /// The question document when one was uploaded and is non-empty, else the
    /// plain question text.
    pub fn question(&self) -> &str {
        match self.question_document.as_deref() {
            Some(doc) if !doc.is_empty() => doc,
            _ => &self.question_text,
        }
    }

    pub fn question_document(&self) -> Option<&str> {
        self.question_document.as_deref()
    }

    pub fn data_files(&self) -> &IndexMap<String, DataContent> {
        &self.data_files
    }

    pub fn has_data_files(&self) -> bool {
        !self.data_files.is_empty()
    }
}
