use crate::error::ApiError;
use crate::models::DocumentPayload;
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// The upstream case-management API, reduced to the two capabilities the
/// tools need. Kept behind a trait so tool logic is testable against fakes.
#[async_trait]
pub trait CaseBackend: Send + Sync {
    /// GET a JSON endpoint and unwrap its `{"data": ...}` envelope.
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError>;

    /// GET a binary document endpoint, capturing the declared MIME type and
    /// any filename the upstream suggests via content disposition.
    async fn fetch_document(&self, path: &str) -> Result<DocumentPayload, ApiError>;
}

pub struct CaseApi {
    client: Client,
    base_url: Url,
    token: String,
}

impl CaseApi {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        // Url::join treats a base without a trailing slash as a file path and
        // would drop its last segment.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(&base)?,
            token: token.into(),
        })
    }
}

#[async_trait]
impl CaseBackend for CaseApi {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = self.base_url.join(path)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: truncate_detail(&detail),
            });
        }

        let body: Value = response.json().await?;
        body.get("data")
            .cloned()
            .ok_or_else(|| ApiError::MissingData(path.to_string()))
    }

    async fn fetch_document(&self, path: &str) -> Result<DocumentPayload, ApiError> {
        let url = self.base_url.join(path)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: truncate_detail(&detail),
            });
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition);

        let bytes = response.bytes().await?;
        Ok(DocumentPayload::new(bytes.to_vec(), mime_type, filename))
    }
}

/// Pulls a filename out of a content-disposition header, preferring the
/// RFC 5987 `filename*=UTF-8''...` form over the quoted fallback.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let extended = Regex::new(r"(?i)filename\*=UTF-8''([^;]+)").ok()?;
    if let Some(captures) = extended.captures(header) {
        let raw = captures.get(1)?.as_str().trim();
        if let Ok(decoded) = percent_decode_str(raw).decode_utf8() {
            return Some(decoded.into_owned());
        }
    }

    let quoted = Regex::new(r#"(?i)filename="([^"]+)""#).ok()?;
    quoted
        .captures(header)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

fn truncate_detail(detail: &str) -> String {
    let trimmed = detail.trim();
    if trimmed.chars().count() > 200 {
        let cut: String = trimmed.chars().take(200).collect();
        format!("{cut}…")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc5987_filename_is_percent_decoded() {
        let header = "attachment; filename*=UTF-8''Intake%20Notes%20%E2%80%93%20final.pdf";
        assert_eq!(
            filename_from_disposition(header).as_deref(),
            Some("Intake Notes – final.pdf")
        );
    }

    #[test]
    fn quoted_filename_is_a_fallback() {
        let header = r#"attachment; filename="retainer.docx""#;
        assert_eq!(
            filename_from_disposition(header).as_deref(),
            Some("retainer.docx")
        );
    }

    #[test]
    fn extended_form_wins_over_quoted_form() {
        let header = r#"attachment; filename="fallback.pdf"; filename*=UTF-8''pr%C3%A9f%C3%A9r%C3%A9.pdf"#;
        assert_eq!(
            filename_from_disposition(header).as_deref(),
            Some("préféré.pdf")
        );
    }

    #[test]
    fn header_without_filename_yields_none() {
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[test]
    fn base_url_gains_a_trailing_slash() {
        let api = CaseApi::new("https://api.example.test/v2", "token").unwrap();
        assert_eq!(
            api.base_url.join("cases/abc").unwrap().as_str(),
            "https://api.example.test/v2/cases/abc"
        );
    }

    #[test]
    fn detail_truncation_keeps_two_hundred_chars() {
        let long = "e".repeat(500);
        let detail = truncate_detail(&long);
        assert_eq!(detail.chars().count(), 201);
        assert!(detail.ends_with('…'));
    }
}
