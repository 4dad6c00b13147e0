use crate::error::{ExtractError, ViewError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One freshly fetched binary document. Produced once per tool invocation and
/// discarded after text extraction; nothing here is cached across calls.
#[derive(Debug, Clone)]
pub struct DocumentPayload {
    pub bytes: Vec<u8>,
    pub declared_mime_type: Option<String>,
    pub suggested_filename: Option<String>,
    pub checksum: String,
    pub fetched_at: DateTime<Utc>,
}

impl DocumentPayload {
    pub fn new(
        bytes: Vec<u8>,
        declared_mime_type: Option<String>,
        suggested_filename: Option<String>,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let checksum = format!("{:x}", hasher.finalize());

        Self {
            bytes,
            declared_mime_type,
            suggested_filename,
            checksum,
            fetched_at: Utc::now(),
        }
    }
}

/// Text derived from a payload. Construction enforces that the text is
/// non-empty after trimming; a blank parse is reported, never returned as an
/// empty success.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub source_identifier: String,
}

impl ExtractedText {
    pub fn new(text: String, source_identifier: String) -> Result<Self, ExtractError> {
        if text.trim().is_empty() {
            return Err(ExtractError::NoText);
        }
        Ok(Self {
            text,
            source_identifier,
        })
    }
}

/// Which projection of the document text a caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessMode {
    Preview,
    Chunk(usize),
    Search(String),
    Full,
}

impl AccessMode {
    /// Parses the wire mode string. `chunk_index` defaults to 0 when omitted;
    /// the search query is validated later, once the text is in hand.
    pub fn parse(
        mode: &str,
        chunk_index: Option<usize>,
        search_query: Option<&str>,
    ) -> Result<Self, ViewError> {
        match mode {
            "preview" => Ok(AccessMode::Preview),
            "chunk" => Ok(AccessMode::Chunk(chunk_index.unwrap_or(0))),
            "search" => Ok(AccessMode::Search(
                search_query.unwrap_or_default().to_string(),
            )),
            "full" => Ok(AccessMode::Full),
            other => Err(ViewError::UnknownMode {
                value: other.to_string(),
            }),
        }
    }
}

/// Identifies a document to fetch plus the requested view of its text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentRequest {
    pub document_id: Option<String>,
    pub document_uuid: Option<String>,
    pub mode: Option<String>,
    pub chunk_index: Option<usize>,
    pub max_chars: Option<serde_json::Value>,
    pub search_query: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_text_rejects_whitespace_only() {
        let result = ExtractedText::new("  \n\t ".to_string(), "doc-1".to_string());
        assert!(matches!(result, Err(ExtractError::NoText)));
    }

    #[test]
    fn payload_checksum_is_stable() {
        let first = DocumentPayload::new(b"abc".to_vec(), None, None);
        let second = DocumentPayload::new(b"abc".to_vec(), None, None);
        assert_eq!(first.checksum, second.checksum);
    }

    #[test]
    fn mode_parse_defaults_chunk_index_to_zero() {
        let mode = AccessMode::parse("chunk", None, None).unwrap();
        assert_eq!(mode, AccessMode::Chunk(0));
    }

    #[test]
    fn mode_parse_rejects_unknown_values() {
        let result = AccessMode::parse("pages", None, None);
        assert!(matches!(result, Err(ViewError::UnknownMode { .. })));
    }
}
