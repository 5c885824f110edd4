//! MCP handlers for questions and raw retrieval.

use std::sync::Arc;

use crate::{
    processing::{AskError, AskRequest, DocumentService},
    retrieval::RetrievalError,
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::{parse_arguments, require_text};

/// Request payload accepted by the `ask` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct AskToolRequest {
    pub(crate) question: String,
    #[serde(default)]
    pub(crate) mode: Option<String>,
    #[serde(default)]
    pub(crate) language: Option<String>,
}

/// Request payload accepted by the `recall` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct RecallToolRequest {
    pub(crate) query: String,
    #[serde(default)]
    pub(crate) top_k: Option<usize>,
}

/// Handle the `ask` tool.
pub(crate) async fn handle_ask(
    service: &Arc<DocumentService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: AskToolRequest = parse_arguments(arguments)?;
    require_text("question", &args.question)?;

    let request = AskRequest::from_labels(
        args.question,
        args.mode.as_deref().unwrap_or_default(),
        args.language.as_deref().unwrap_or_default(),
    );
    let outcome = service.ask(request).await.map_err(ask_error)?;

    Ok(CallToolResult::structured(json!({
        "question": outcome.question,
        "mode": outcome.mode,
        "language": outcome.language,
        "intent": outcome.intent,
        "answer": outcome.answer,
        "contextChunks": outcome.context_chunks,
        "generated": outcome.generated,
    })))
}

/// Handle the `recall` tool.
pub(crate) async fn handle_recall(
    service: &Arc<DocumentService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: RecallToolRequest = parse_arguments(arguments)?;
    require_text("query", &args.query)?;
    if args.top_k == Some(0) {
        return Err(McpError::invalid_params("`top_k` must be at least 1", None));
    }

    let chunks = service
        .recall(&args.query, args.top_k)
        .await
        .map_err(|err| ask_error(err.into()))?;

    Ok(CallToolResult::structured(json!({
        "query": args.query,
        "count": chunks.len(),
        "chunks": chunks,
    })))
}

fn ask_error(error: AskError) -> McpError {
    match &error {
        AskError::Retrieval(RetrievalError::EmptyQuestion) => {
            McpError::invalid_params(error.to_string(), None)
        }
        _ => McpError::internal_error(error.to_string(), None),
    }
}
