//! MCP server entrypoint (stdio transport).
//!
//! Exposes the document QA tools and resources over stdio for editor and agent integrations.
//! Stdout carries protocol frames, so logs go to the log file only. Runtime configuration is
//! shared with the HTTP binary.
use anyhow::{Context, Result};
use docqa::{config, logging, logging::LogTarget, mcp::DocQaMcpServer, processing::DocumentService};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing(LogTarget::FileOnly);

    let service = DocumentService::new().context("failed to initialize document service")?;
    let server = DocQaMcpServer::new(Arc::new(service));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
