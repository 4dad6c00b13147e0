use crate::chunking::{effective_max_chars, estimate_tokens, render_view};
use crate::client::CaseBackend;
use crate::error::{Result, ToolError};
use crate::extract::extract_text;
use crate::models::{AccessMode, DocumentRequest};
use serde_json::{json, Value};

/// The four tool operations over an abstract backend. Each call is
/// self-contained: its own fetch, its own extraction, its own chunking, no
/// state shared between invocations.
pub struct CaseTools<B: CaseBackend> {
    backend: B,
}

impl<B: CaseBackend> CaseTools<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Looks a case up by its human-facing number and projects the summary
    /// fields. Zero matches is a structured not-found outcome, not a crash.
    pub async fn search_case_by_number(&self, case_number: &str) -> Result<Value> {
        let case_number = case_number.trim();
        if case_number.is_empty() {
            return Err(ToolError::MissingParameter("case_number"));
        }

        let data = self
            .backend
            .get_json("cases", &[("case_number", case_number)])
            .await?;
        let matches = as_record_list(&data);

        let Some(case) = matches.first() else {
            return Err(ToolError::NotFound {
                message: format!("No case found with case number '{case_number}'"),
                suggestion:
                    "Check the case number format; it must match the upstream records exactly."
                        .to_string(),
            });
        };

        Ok(json!({
            "success": true,
            "matter_uuid": field(case, &["matter_uuid", "uuid"]),
            "case_id": field(case, &["case_id", "id"]),
            "case_number": field(case, &["case_number"]),
            "client_name": field(case, &["client_name", "client_full_name"]),
            "case_disposition": field(case, &["case_disposition", "disposition"]),
            "date_opened": field(case, &["date_opened"]),
            "legal_problem_code": field(case, &["legal_problem_code"]),
            "case_profile_url": field(case, &["case_profile_url", "profile_url"]),
            "match_count": matches.len(),
        }))
    }

    /// Full case detail: identifier, client, date, location, and
    /// legal-problem blocks, plus notes filtered down to active ones.
    pub async fn get_case_info(&self, case_uuid: &str) -> Result<Value> {
        let case_uuid = case_uuid.trim();
        if case_uuid.is_empty() {
            return Err(ToolError::MissingParameter("case_uuid"));
        }

        let data = self
            .backend
            .get_json(&format!("cases/{case_uuid}"), &[])
            .await?;
        if data.is_null() {
            return Err(ToolError::NotFound {
                message: format!("No case found with uuid '{case_uuid}'"),
                suggestion: "Look the uuid up with search_case_by_number first.".to_string(),
            });
        }

        let notes = data
            .get("notes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let note_count_total = notes.len();
        let active_notes: Vec<Value> = notes
            .iter()
            .filter(|note| note_is_active(note))
            .map(project_note)
            .collect();
        let note_count_active = active_notes.len();

        Ok(json!({
            "success": true,
            "matter_uuid": field(&data, &["matter_uuid", "uuid"]),
            "case_id": field(&data, &["case_id", "id"]),
            "case_number": field(&data, &["case_number"]),
            "case_disposition": field(&data, &["case_disposition", "disposition"]),
            "case_status": field(&data, &["case_status", "status"]),
            "client": {
                "name": field(&data, &["client_name", "client_full_name"]),
                "email": field(&data, &["client_email", "email"]),
                "phone": field(&data, &["client_phone", "phone"]),
            },
            "dates": {
                "opened": field(&data, &["date_opened"]),
                "closed": field(&data, &["date_closed"]),
                "intake": field(&data, &["date_of_intake", "intake_date"]),
            },
            "location": {
                "county": field(&data, &["county_of_residence", "county"]),
                "state": field(&data, &["state"]),
                "zip": field(&data, &["zip_code", "zip"]),
            },
            "legal_problem": {
                "code": field(&data, &["legal_problem_code"]),
                "description": field(&data, &["legal_problem_description"]),
                "category": field(&data, &["legal_problem_category"]),
            },
            "notes": active_notes,
            "note_count_total": note_count_total,
            "note_count_active": note_count_active,
        }))
    }

    /// Lists a case's documents with size and token-cost estimates so the
    /// caller can decide how to read each one.
    pub async fn list_case_documents(&self, case_uuid: &str) -> Result<Value> {
        let case_uuid = case_uuid.trim();
        if case_uuid.is_empty() {
            return Err(ToolError::MissingParameter("case_uuid"));
        }

        let data = self
            .backend
            .get_json(&format!("cases/{case_uuid}/documents"), &[])
            .await?;
        let documents: Vec<Value> = as_record_list(&data).iter().map(project_document).collect();

        Ok(json!({
            "success": true,
            "case_uuid": case_uuid,
            "document_count": documents.len(),
            "documents": documents,
        }))
    }

    /// Fetches one document fresh, extracts its text, and serves the
    /// requested bounded view of it.
    pub async fn get_document(&self, request: &DocumentRequest) -> Result<Value> {
        let locator = document_locator(request)?;
        let mode = AccessMode::parse(
            request.mode.as_deref().unwrap_or("preview"),
            request.chunk_index,
            request.search_query.as_deref(),
        )?;
        let max_chars = effective_max_chars(request.max_chars.as_ref());

        let payload = self.backend.fetch_document(&locator.path).await?;
        let identifier = payload
            .suggested_filename
            .clone()
            .unwrap_or_else(|| locator.identifier.clone());
        let mime_type = payload.declared_mime_type.clone();
        let checksum = payload.checksum.clone();

        // PDF and word-processor parsing is CPU-bound; keep it off the
        // async worker threads.
        let extracted = tokio::task::spawn_blocking({
            let identifier = identifier.clone();
            move || extract_text(&payload, &identifier)
        })
        .await
        .map_err(|error| ToolError::Internal(error.to_string()))??;

        let view = render_view(&extracted.text, &mode, max_chars)?;
        let mut value =
            serde_json::to_value(view).map_err(|error| ToolError::Internal(error.to_string()))?;
        if let Value::Object(map) = &mut value {
            map.insert("success".to_string(), Value::Bool(true));
            map.insert("document_name".to_string(), json!(identifier));
            map.insert("mime_type".to_string(), json!(mime_type));
            map.insert("checksum".to_string(), json!(checksum));
        }
        Ok(value)
    }
}

struct DocumentLocator {
    path: String,
    identifier: String,
}

fn document_locator(request: &DocumentRequest) -> Result<DocumentLocator> {
    if let Some(uuid) = non_empty(request.document_uuid.as_deref()) {
        return Ok(DocumentLocator {
            path: format!("documents/{uuid}/download"),
            identifier: uuid.to_string(),
        });
    }
    if let Some(id) = non_empty(request.document_id.as_deref()) {
        return Ok(DocumentLocator {
            path: format!("documents/{id}/download"),
            identifier: id.to_string(),
        });
    }
    Err(ToolError::MissingParameter("document_id or document_uuid"))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Upstream list endpoints return either an array or a single object under
/// the `data` envelope.
fn as_record_list(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// First present key wins; absent keys project as null rather than being
/// dropped, so the payload stays a flat, predictable record.
fn field(record: &Value, keys: &[&str]) -> Value {
    keys.iter()
        .find_map(|key| record.get(*key).filter(|v| !v.is_null()).cloned())
        .unwrap_or(Value::Null)
}

/// A note with no active flag at all counts as active; only an explicit
/// `false` hides it.
fn note_is_active(note: &Value) -> bool {
    ["active", "is_active"]
        .iter()
        .find_map(|key| note.get(*key).and_then(Value::as_bool))
        .unwrap_or(true)
}

fn project_note(note: &Value) -> Value {
    json!({
        "subject": field(note, &["subject", "title"]),
        "body": field(note, &["body", "note_text", "note"]),
        "date": field(note, &["date_posted", "date", "created_at"]),
        "author": field(note, &["author", "posted_by", "created_by"]),
    })
}

fn project_document(document: &Value) -> Value {
    let size_bytes = ["size_bytes", "file_size_bytes", "size"]
        .iter()
        .find_map(|key| document.get(*key).and_then(Value::as_u64))
        .unwrap_or(0);

    json!({
        "guid": field(document, &["guid", "uuid"]),
        "internal_id": field(document, &["internal_id", "id"]),
        "name": field(document, &["name", "filename"]),
        "title": field(document, &["title"]),
        "mime_type": field(document, &["mime_type", "content_type"]),
        "size_bytes": size_bytes,
        "estimated_tokens": estimate_tokens(size_bytes as usize),
        "file_size": human_size(size_bytes),
        "date_created": field(document, &["date_created", "created_at"]),
        "date_modified": field(document, &["date_modified", "updated_at"]),
        "virus_scanned": field(document, &["virus_scanned"]),
        "virus_free": field(document, &["virus_free"]),
        "folder_id": field(document, &["folder_id"]),
    })
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
