pub mod chunking;
pub mod client;
pub mod error;
pub mod extract;
pub mod models;
pub mod tools;

pub use chunking::{
    effective_max_chars, estimate_tokens, render_view, split_chunks, DocumentView, TextStats,
    DEFAULT_MAX_CHARS, FULL_MODE_TOKEN_CEILING,
};
pub use client::{filename_from_disposition, CaseApi, CaseBackend};
pub use error::{ApiError, ExtractError, ToolError, ViewError};
pub use extract::{detect_format, extract_text, DocumentFormat};
pub use models::{AccessMode, DocumentPayload, DocumentRequest, ExtractedText};
pub use tools::CaseTools;
