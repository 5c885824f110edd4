//! Model Context Protocol (MCP) integration for docqa.
//!
//! This module wires the document pipeline into an MCP server so editors and agent hosts can
//! load a document and ask questions about it over stdio. The surface area consists of:
//!
//! - Tools: `upload` (by local path), `ask`, `recall`, `reset`, and `metrics`.
//! - Resources: `mcp://health`, `mcp://settings`, and `mcp://usage`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::DocQaMcpServer;

/// Mode labels accepted by the `ask` tool.
pub(crate) const MODES: [&str; 5] = ["qa", "summary", "short_notes", "long_notes", "bullets"];

/// Language labels accepted by the `ask` tool.
pub(crate) const LANGUAGES: [&str; 3] = ["english", "hindi", "hinglish"];
