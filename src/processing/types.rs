//! Core data types and error definitions for the document pipeline.

use crate::{
    embedding::EmbeddingClientError,
    extraction::ExtractionError,
    generation::GenerationError,
    retrieval::{IndexError, Language, Mode, QueryIntent, RetrievalError},
};
use serde::Serialize;
use thiserror::Error;

/// Ordered fragment of a document's normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// 0-based position in the document's chunk sequence.
    pub index: usize,
    /// Chunk contents; at most `chunk_size` characters.
    pub text: String,
}

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an empty window.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would stop the window from advancing.
    #[error("chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidOverlap {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested window width in characters.
        chunk_size: usize,
    },
}

/// Errors emitted while uploading and indexing a document.
#[derive(Debug, Error)]
pub enum UploadError {
    /// File could not be stored or decoded.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Chunking parameters were invalid.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The new epoch failed validation; the previous document stays loaded.
    #[error("Failed to index document: {0}")]
    Indexing(#[from] IndexError),
    /// Upload storage failed.
    #[error("Failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
    /// Upload exceeded the configured size limit.
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Size of the rejected upload.
        size: u64,
        /// Configured `MAX_UPLOAD_BYTES`.
        limit: u64,
    },
}

/// Errors raised while wiring the service from configuration.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Chunking parameters were rejected.
    #[error("Invalid chunking configuration: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding client could not be built.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Generation client could not be built.
    #[error("Failed to initialize generation client: {0}")]
    Generation(#[from] GenerationError),
}

/// Summary of a published upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Sanitized name the upload was stored under.
    pub filename: String,
    /// Characters of normalized extracted text.
    pub char_count: usize,
    /// Chunks indexed for the document.
    pub chunk_count: usize,
    /// Identifier of the epoch now serving questions.
    pub epoch_id: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub sha256: String,
}

/// Question plus the caller's presentation preferences.
#[derive(Debug, Clone)]
pub struct AskRequest {
    /// Natural-language question.
    pub question: String,
    /// Requested answer shape.
    pub mode: Mode,
    /// Requested answer language.
    pub language: Language,
}

impl AskRequest {
    /// Build a request from raw strings; unknown mode/language fall back to `qa`/`english`.
    pub fn from_labels(question: impl Into<String>, mode: &str, language: &str) -> Self {
        Self {
            question: question.into(),
            mode: Mode::from_label(mode),
            language: Language::from_label(language),
        }
    }
}

/// Answer plus routing details.
#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    /// Question as asked, trimmed.
    pub question: String,
    /// Mode used to pick the template.
    pub mode: Mode,
    /// Language used for the instruction.
    pub language: Language,
    /// Classified retrieval intent.
    pub intent: QueryIntent,
    /// Final answer text.
    pub answer: String,
    /// Chunks that made it into the context after budgeting.
    pub context_chunks: usize,
    /// Whether the generation provider was called.
    pub generated: bool,
}

/// Errors emitted while answering a question.
#[derive(Debug, Error)]
pub enum AskError {
    /// Context could not be retrieved for the question.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    /// Generation provider failed.
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] GenerationError),
}
