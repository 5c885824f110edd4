//! Formatting helpers shared across MCP handlers and resources.

use crate::{
    config::{Config, DistanceMetric, EmbeddingProvider, GenerationProvider},
    retrieval::IndexStatus,
};
use rmcp::model::ResourceContents;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Value, json};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Health snapshot returned by the `health` resource.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HealthSnapshot {
    pub(crate) embedding: ProviderSnapshot,
    pub(crate) generation: ProviderSnapshot,
    pub(crate) index: IndexSnapshot,
}

/// Provider identity for one collaborator.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProviderSnapshot {
    /// Provider label (`hash`, `ollama`, `openai`).
    pub(crate) provider: &'static str,
    /// Model name passed to the provider.
    pub(crate) model: String,
    /// Vector length, for embedding providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) dimension: Option<usize>,
}

/// The live epoch as seen by MCP clients.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexSnapshot {
    pub(crate) epoch_id: String,
    pub(crate) records: usize,
    pub(crate) dimension: Option<usize>,
    pub(crate) source: Option<String>,
    pub(crate) created_at: String,
}

impl From<IndexStatus> for IndexSnapshot {
    fn from(status: IndexStatus) -> Self {
        Self {
            epoch_id: status.epoch_id,
            records: status.records,
            dimension: status.dimension,
            source: status.source,
            created_at: status.created_at,
        }
    }
}

/// Effective chunking and retrieval limits returned by the `settings` resource.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SettingsSnapshot {
    pub(crate) chunk_size: usize,
    pub(crate) chunk_overlap: usize,
    pub(crate) context_max_chars: usize,
    pub(crate) search_top_k: usize,
    pub(crate) verbatim_chunk_limit: usize,
    pub(crate) summary_chunk_limit: usize,
    /// `cosine` or `l2`.
    pub(crate) distance_metric: &'static str,
    pub(crate) enable_ocr: bool,
    pub(crate) max_upload_bytes: usize,
}

/// Build the health snapshot from configuration and the live index.
pub(crate) fn health_snapshot(config: &Config, status: IndexStatus) -> HealthSnapshot {
    HealthSnapshot {
        embedding: ProviderSnapshot {
            provider: embedding_provider_label(config.embedding_provider),
            model: config.embedding_model.clone(),
            dimension: Some(config.embedding_dimension),
        },
        generation: ProviderSnapshot {
            provider: generation_provider_label(config.generation_provider),
            model: config.generation_model.clone(),
            dimension: None,
        },
        index: status.into(),
    }
}

/// Build the settings snapshot from configuration.
pub(crate) fn settings_snapshot(config: &Config) -> SettingsSnapshot {
    SettingsSnapshot {
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
        context_max_chars: config.context_max_chars,
        search_top_k: config.search_top_k,
        verbatim_chunk_limit: config.verbatim_chunk_limit,
        summary_chunk_limit: config.summary_chunk_limit,
        distance_metric: match config.distance_metric {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
        },
        enable_ocr: config.enable_ocr,
        max_upload_bytes: config.max_upload_bytes,
    }
}

/// Recommended tool flow for hosts.
pub(crate) fn usage_payload() -> Value {
    json!({
        "title": "docqa MCP Usage",
        "policy": [
            "Load exactly one document with `upload`; a new upload replaces the previous one.",
            "Ask questions with `ask`; answers come only from the loaded document.",
            "Phrases like 'exact text' or 'word by word' reproduce document text verbatim.",
            "Use mode=summary or phrases like 'whole document' for document-wide answers.",
            "Use `recall` to inspect which chunks a query retrieves.",
        ],
        "flows": [
            {
                "name": "Load & Ask",
                "steps": [
                    "upload({ path })",
                    "ask({ question, mode?, language? })"
                ]
            },
            {
                "name": "Debug retrieval",
                "steps": [
                    "recall({ query, top_k? })",
                    "reset()"
                ]
            }
        ]
    })
}

fn embedding_provider_label(provider: EmbeddingProvider) -> &'static str {
    match provider {
        EmbeddingProvider::Hash => "hash",
        EmbeddingProvider::Ollama => "ollama",
    }
}

fn generation_provider_label(provider: GenerationProvider) -> &'static str {
    match provider {
        GenerationProvider::Ollama => "ollama",
        GenerationProvider::OpenAI => "openai",
    }
}

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}
