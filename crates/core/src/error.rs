use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream responded with status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("upstream response missing `data` envelope for {0}")]
    MissingData(String),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is an image ({mime_type}); text extraction is not supported")]
    ImageNotReadable { mime_type: String },

    #[error("unsupported document format {mime_type} for {identifier}")]
    Unsupported {
        mime_type: String,
        identifier: String,
    },

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("word-processor parse error: {0}")]
    WordParse(String),

    #[error("No text content could be extracted")]
    NoText,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("No text content could be extracted")]
    NoText,

    #[error("chunk_index {index} out of range; valid range is 0-{max}")]
    ChunkOutOfRange { index: usize, max: usize },

    #[error("search_query is empty")]
    EmptyQuery,

    #[error("document is about {estimated_tokens} tokens, above the {limit} token ceiling for full mode")]
    TooLargeForFull {
        estimated_tokens: usize,
        limit: usize,
    },

    #[error("unknown mode '{value}'; accepted modes are preview, chunk, search, full")]
    UnknownMode { value: String },

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Boundary error for the four tool operations. Every variant maps to a
/// structured `{success: false, error, suggestion}` payload; nothing here is
/// allowed to cross the RPC boundary as a panic.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("{message}")]
    NotFound { message: String, suggestion: String },

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Extract(#[from] ExtractError),

    #[error("{0}")]
    View(#[from] ViewError),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn suggestion(&self) -> String {
        match self {
            ToolError::MissingParameter(name) => {
                format!("Provide the '{name}' argument and retry.")
            }
            ToolError::NotFound { suggestion, .. } => suggestion.clone(),
            ToolError::Api(ApiError::Status { status, .. }) if *status == 404 => {
                "Verify the identifier; the upstream API does not know it.".to_string()
            }
            ToolError::Api(_) => {
                "Check connectivity and credentials for the case-management API, then retry."
                    .to_string()
            }
            ToolError::Extract(ExtractError::ImageNotReadable { .. }) => {
                "This document is an image. Run OCR externally or ask a human for a description."
                    .to_string()
            }
            ToolError::Extract(ExtractError::Unsupported { .. }) => {
                "Only plain text, PDF, and word-processor documents can be read.".to_string()
            }
            ToolError::Extract(ExtractError::NoText) | ToolError::View(ViewError::NoText) => {
                "The document may be scanned or empty; OCR is not supported.".to_string()
            }
            ToolError::Extract(_) => {
                "The document could not be parsed; it may be corrupt or password-protected."
                    .to_string()
            }
            ToolError::View(ViewError::ChunkOutOfRange { max, .. }) => {
                format!("Request a chunk_index between 0 and {max}.")
            }
            ToolError::View(ViewError::EmptyQuery) => {
                "Provide a non-empty search_query for mode=search.".to_string()
            }
            ToolError::View(ViewError::TooLargeForFull { .. }) => {
                "Use mode=preview, mode=chunk, or mode=search to read this document in bounded pieces."
                    .to_string()
            }
            ToolError::View(ViewError::UnknownMode { .. }) => {
                "Use one of: preview, chunk, search, full.".to_string()
            }
            ToolError::View(_) | ToolError::Internal(_) => {
                "Retry the call; if the failure persists, report it.".to_string()
            }
        }
    }

    /// The `{success: false, error, suggestion}` shape every tool returns on
    /// an expected failure.
    pub fn failure_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "suggestion": self.suggestion(),
        })
    }
}

pub type Result<T, E = ToolError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_payload_is_flat_and_tagged() {
        let error = ToolError::MissingParameter("case_number");
        let payload = error.failure_payload();

        assert_eq!(payload["success"], false);
        assert!(payload["error"]
            .as_str()
            .unwrap()
            .contains("case_number"));
        assert!(!payload["suggestion"].as_str().unwrap().is_empty());
    }

    #[test]
    fn chunk_range_suggestion_names_the_bounds() {
        let error = ToolError::from(ViewError::ChunkOutOfRange { index: 5, max: 2 });
        assert!(error.to_string().contains("0-2"));
        assert!(error.suggestion().contains('2'));
    }
}
