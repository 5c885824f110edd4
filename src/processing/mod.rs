//! Document pipeline: upload handling, chunking, and question answering orchestration.

pub mod chunking;
pub mod sanitize;
mod service;
pub mod types;

pub use chunking::{Chunker, chunk_text};
pub use service::{DocumentApi, DocumentService};
pub use types::{
    AskError, AskOutcome, AskRequest, Chunk, ChunkingError, ServiceInitError, UploadError,
    UploadOutcome,
};
