//! MCP handlers that load and drop the document.

use std::{path::PathBuf, sync::Arc};

use crate::{
    extraction::ExtractionError,
    processing::{DocumentService, UploadError},
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::parse_arguments;

/// Request payload accepted by the `upload` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadToolRequest {
    /// Local path of the document to load.
    pub(crate) path: PathBuf,
}

/// Handle the `upload` tool by loading a local file as the new document.
pub(crate) async fn handle_upload(
    service: &Arc<DocumentService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: UploadToolRequest = parse_arguments(arguments)?;
    if args.path.as_os_str().is_empty() {
        return Err(McpError::invalid_params("`path` must not be empty", None));
    }

    let outcome = service
        .upload_path(&args.path)
        .await
        .map_err(upload_error)?;

    Ok(CallToolResult::structured(json!({
        "status": "ok",
        "filename": outcome.filename,
        "characters": outcome.char_count,
        "totalChunks": outcome.chunk_count,
        "epochId": outcome.epoch_id,
        "sha256": outcome.sha256,
    })))
}

/// Handle the `reset` tool.
pub(crate) async fn handle_reset(
    service: &Arc<DocumentService>,
) -> Result<CallToolResult, McpError> {
    let status = service.reset();
    Ok(CallToolResult::structured(json!({
        "status": "vector memory cleared",
        "epochId": status.epoch_id,
    })))
}

fn upload_error(error: UploadError) -> McpError {
    match &error {
        UploadError::Extraction(
            ExtractionError::UnsupportedFileType { .. } | ExtractionError::NoExtractableText,
        )
        | UploadError::TooLarge { .. } => McpError::invalid_params(error.to_string(), None),
        UploadError::Storage(io) if io.kind() == std::io::ErrorKind::NotFound => {
            McpError::invalid_params(error.to_string(), None)
        }
        _ => McpError::internal_error(error.to_string(), None),
    }
}
