use crate::error::ViewError;
use crate::models::AccessMode;
use regex::Regex;
use serde::Serialize;

pub const DEFAULT_MAX_CHARS: usize = 8000;
pub const FULL_MODE_TOKEN_CEILING: usize = 40_000;

/// Resolves the wire `max_chars` value. Anything that is not a positive
/// number silently falls back to the default budget.
pub fn effective_max_chars(raw: Option<&serde_json::Value>) -> usize {
    let parsed = match raw {
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<i64>().ok())),
        None => None,
    };

    match parsed {
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_MAX_CHARS,
    }
}

/// Character count heuristic for token cost: one token per four characters.
pub fn estimate_tokens(char_count: usize) -> usize {
    ((char_count as f64) / 4.0).round() as usize
}

/// Partitions text into contiguous chunks of at most `max_chars` characters.
/// Chunks cover the text exactly once in order, and every chunk except
/// possibly the last is exactly `max_chars` long, so chunk boundaries are
/// deterministic across separate calls with the same inputs.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

fn split_paragraphs(text: &str) -> Result<Vec<&str>, ViewError> {
    let boundary = Regex::new(r"\n{2,}")?;
    Ok(boundary
        .split(text)
        .filter(|paragraph| !paragraph.trim().is_empty())
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct TextStats {
    pub total_length: usize,
    pub estimated_tokens: usize,
    pub approx_chunks: usize,
}

/// The bounded projection served back to the caller, tagged by mode.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DocumentView {
    Preview {
        chunk_index: usize,
        #[serde(flatten)]
        stats: TextStats,
        text: String,
    },
    Chunk {
        chunk_index: usize,
        #[serde(flatten)]
        stats: TextStats,
        text: String,
    },
    Search {
        query: String,
        match_count: usize,
        #[serde(flatten)]
        stats: TextStats,
        text: String,
    },
    Full {
        #[serde(flatten)]
        stats: TextStats,
        truncated: bool,
        text: String,
    },
}

/// Computes the requested view of `text` under the character budget. Pure:
/// identical inputs always produce the identical view, with no state carried
/// between calls.
pub fn render_view(
    text: &str,
    mode: &AccessMode,
    max_chars: usize,
) -> Result<DocumentView, ViewError> {
    if text.trim().is_empty() {
        return Err(ViewError::NoText);
    }

    let total_length = text.chars().count();
    let chunks = split_chunks(text, max_chars);
    let stats = TextStats {
        total_length,
        estimated_tokens: estimate_tokens(total_length),
        approx_chunks: chunks.len(),
    };

    match mode {
        AccessMode::Preview => Ok(DocumentView::Preview {
            chunk_index: 0,
            text: chunks.into_iter().next().unwrap_or_default(),
            stats,
        }),
        AccessMode::Chunk(index) => {
            let max = chunks.len().saturating_sub(1);
            let Some(chunk) = chunks.into_iter().nth(*index) else {
                return Err(ViewError::ChunkOutOfRange { index: *index, max });
            };
            Ok(DocumentView::Chunk {
                chunk_index: *index,
                text: chunk,
                stats,
            })
        }
        AccessMode::Search(query) => {
            let (match_count, snippet_text) = search_snippets(text, query, max_chars)?;
            Ok(DocumentView::Search {
                query: query.trim().to_lowercase(),
                match_count,
                text: snippet_text,
                stats,
            })
        }
        AccessMode::Full => {
            if stats.estimated_tokens > FULL_MODE_TOKEN_CEILING {
                return Err(ViewError::TooLargeForFull {
                    estimated_tokens: stats.estimated_tokens,
                    limit: FULL_MODE_TOKEN_CEILING,
                });
            }
            let truncated = total_length > max_chars;
            let text: String = text.chars().take(max_chars).collect();
            Ok(DocumentView::Full {
                stats,
                truncated,
                text,
            })
        }
    }
}

/// Case-insensitive paragraph search. Each matching paragraph is emitted with
/// its immediate neighbors as context, in document order, until appending the
/// next snippet would push the output past the budget. Earlier matches are
/// never evicted for later ones; overlapping context between adjacent matches
/// is emitted as-is.
fn search_snippets(
    text: &str,
    query: &str,
    max_chars: usize,
) -> Result<(usize, String), ViewError> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(ViewError::EmptyQuery);
    }

    let paragraphs = split_paragraphs(text)?;
    let mut match_count = 0;
    let mut assembled = String::new();
    let mut assembled_chars = 0usize;
    let mut budget_hit = false;

    for (position, paragraph) in paragraphs.iter().enumerate() {
        if !paragraph.to_lowercase().contains(&needle) {
            continue;
        }
        match_count += 1;
        if budget_hit {
            continue;
        }

        let start = position.saturating_sub(1);
        let end = (position + 1).min(paragraphs.len().saturating_sub(1));
        let snippet = paragraphs[start..=end].join("\n\n");

        let snippet_chars = snippet.chars().count();
        let joiner_chars = if assembled.is_empty() { 0 } else { 2 };
        if assembled_chars + joiner_chars + snippet_chars > max_chars {
            budget_hit = true;
            continue;
        }

        if !assembled.is_empty() {
            assembled.push_str("\n\n");
        }
        assembled.push_str(&snippet);
        assembled_chars += joiner_chars + snippet_chars;
    }

    Ok((match_count, assembled))
}
