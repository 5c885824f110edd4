#![deny(missing_docs)]

//! Core library for docqa: single-document question answering over a swappable vector index.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// File-to-text extraction for uploads.
pub mod extraction;
/// Generation client abstraction and adapters.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Pipeline metrics helpers.
pub mod metrics;
/// Upload and question-answering pipeline.
pub mod processing;
/// Vector index, intent classification, context assembly and prompts.
pub mod retrieval;
