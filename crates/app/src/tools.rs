//! MCP surface for the caselink tools.
//!
//! Every tool body delegates to `caselink_core::CaseTools` and turns expected
//! failures into the `{success: false, error, suggestion}` payload. Anything
//! unexpected is wrapped at one point into `{error: true, tool, message,
//! suggestion}` with the MCP error flag set, so no failure ever crosses the
//! RPC boundary as a panic.

use caselink_core::{CaseApi, CaseTools, DocumentRequest, ToolError};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub struct CaselinkService {
    tools: Arc<CaseTools<CaseApi>>,
    tool_router: ToolRouter<Self>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchCaseParams {
    #[schemars(description = "Human-facing case number, e.g. 24-0001234")]
    pub case_number: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CaseInfoParams {
    #[schemars(description = "Case uuid, as returned by search_case_by_number")]
    pub case_uuid: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDocumentsParams {
    #[schemars(description = "Case uuid, as returned by search_case_by_number")]
    pub case_uuid: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetDocumentParams {
    #[schemars(description = "Internal document id (number or string)")]
    pub document_id: Option<Value>,

    #[schemars(description = "Document uuid; preferred over document_id when both are given")]
    pub document_uuid: Option<String>,

    #[schemars(description = "preview (default) | chunk | search | full")]
    pub mode: Option<String>,

    #[schemars(description = "Zero-based chunk index for mode=chunk")]
    pub chunk_index: Option<usize>,

    #[schemars(description = "Character budget per response; defaults to 8000")]
    pub max_chars: Option<Value>,

    #[schemars(description = "Case-insensitive query for mode=search")]
    pub search_query: Option<String>,
}

#[tool_router]
impl CaselinkService {
    pub fn new(api: CaseApi) -> Self {
        Self {
            tools: Arc::new(CaseTools::new(api)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Look up a case by its case number. Returns the matter uuid needed by the other tools, plus client name, disposition, opening date, and legal problem code."
    )]
    async fn search_case_by_number(
        &self,
        Parameters(params): Parameters<SearchCaseParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(
                "search_case_by_number",
                self.tools.search_case_by_number(&params.case_number),
            )
            .await)
    }

    #[tool(
        description = "Full detail for one case: identifiers, client contact, dates, location, legal problem, and the active case notes."
    )]
    async fn get_case_info(
        &self,
        Parameters(params): Parameters<CaseInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch("get_case_info", self.tools.get_case_info(&params.case_uuid))
            .await)
    }

    #[tool(
        description = "List a case's documents with size and estimated token cost, so you can pick a reading mode before fetching content."
    )]
    async fn list_case_documents(
        &self,
        Parameters(params): Parameters<ListDocumentsParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(
                "list_case_documents",
                self.tools.list_case_documents(&params.case_uuid),
            )
            .await)
    }

    #[tool(
        description = "Read a document's text in bounded pieces. mode=preview returns the first chunk; mode=chunk pages through deterministic chunk indices; mode=search returns matching paragraphs with context; mode=full returns the whole text only for small documents. Images are not readable (no OCR)."
    )]
    async fn get_document(
        &self,
        Parameters(params): Parameters<GetDocumentParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = DocumentRequest {
            document_id: params.document_id.as_ref().and_then(id_to_string),
            document_uuid: params.document_uuid,
            mode: params.mode,
            chunk_index: params.chunk_index,
            max_chars: params.max_chars,
            search_query: params.search_query,
        };
        Ok(self
            .dispatch("get_document", self.tools.get_document(&request))
            .await)
    }

    /// Single conversion point between tool outcomes and the RPC envelope.
    async fn dispatch<F>(&self, tool: &str, call: F) -> CallToolResult
    where
        F: Future<Output = Result<Value, ToolError>>,
    {
        match call.await {
            Ok(payload) => render(tool, &payload),
            Err(ToolError::Internal(message)) => {
                tracing::error!(tool, message = %message, "unexpected tool failure");
                internal_failure(tool, &message)
            }
            Err(error) => {
                tracing::warn!(tool, error = %error, "tool call failed");
                render(tool, &error.failure_payload())
            }
        }
    }
}

fn render(tool: &str, payload: &Value) -> CallToolResult {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(error) => internal_failure(tool, &error.to_string()),
    }
}

fn internal_failure(tool: &str, message: &str) -> CallToolResult {
    let wrapped = json!({
        "error": true,
        "tool": tool,
        "message": message,
        "suggestion": "Retry the call; if the failure persists, report it.",
    });
    CallToolResult::error(vec![Content::text(wrapped.to_string())])
}

/// The upstream id is numeric, but agents pass it as either a number or a
/// string; accept both.
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[tool_handler]
impl ServerHandler for CaselinkService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Caselink bridges a case-management system. Start with search_case_by_number to resolve a case uuid, then get_case_info for detail, list_case_documents to see what is attached, and get_document to read document text in bounded chunks."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
