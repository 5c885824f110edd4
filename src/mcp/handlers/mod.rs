//! Tool handlers for the MCP server.

use rmcp::{ErrorData as McpError, model::JsonObject};
use serde::de::DeserializeOwned;

pub mod ask;
pub mod document;
pub mod metrics;

/// Deserialize tool arguments; a missing argument object reads as `{}`.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    let object = arguments.unwrap_or_default();
    serde_json::from_value(object.into()).map_err(|err| {
        tracing::debug!(%err, "Rejected MCP tool arguments");
        McpError::invalid_params(format!("Invalid arguments: {err}"), None)
    })
}

/// Reject a whitespace-only text argument.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), McpError> {
    if value.trim().is_empty() {
        return Err(McpError::invalid_params(
            format!("`{field}` must not be empty"),
            None,
        ));
    }
    Ok(())
}
