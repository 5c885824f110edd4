//! Handler for the metrics tool.

use std::sync::Arc;

use crate::processing::DocumentService;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `metrics` tool, returning the pipeline counters.
pub(crate) async fn handle_metrics(
    service: &Arc<DocumentService>,
) -> Result<CallToolResult, McpError> {
    let snapshot = service.metrics_snapshot();
    Ok(CallToolResult::structured(json!({
        "documentsUploaded": snapshot.documents_uploaded,
        "chunksIndexed": snapshot.chunks_indexed,
        "lastChunkCount": snapshot.last_chunk_count,
        "questionsAnswered": snapshot.questions_answered,
        "emptyRetrievals": snapshot.empty_retrievals,
        "generationCalls": snapshot.generation_calls,
    })))
}
