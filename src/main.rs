use std::net::{Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use docqa::{api, config, logging, logging::LogTarget, processing::DocumentService};
use tokio::net::TcpListener;

/// Ports tried in order when `SERVER_PORT` is unset.
const FALLBACK_PORTS: RangeInclusive<u16> = 4100..=4199;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing(LogTarget::StdoutAndFile);

    let config = config::get_config();
    let service = DocumentService::new().context("failed to initialize document service")?;
    let app = api::create_router(Arc::new(service), config.max_upload_bytes);

    let listener = bind_listener(config.server_port).await?;
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!(%addr, upload_limit = config.max_upload_bytes, "docqa HTTP server listening");
    axum::serve(listener, app).await.context("HTTP server terminated")?;
    Ok(())
}

async fn bind_listener(port: Option<u16>) -> Result<TcpListener> {
    if let Some(port) = port {
        return TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .await
            .with_context(|| format!("failed to bind SERVER_PORT {port}"));
    }

    for port in FALLBACK_PORTS {
        match TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port in use");
            }
            Err(err) => return Err(err).with_context(|| format!("failed to bind port {port}")),
        }
    }
    bail!(
        "no free port in {}-{}",
        FALLBACK_PORTS.start(),
        FALLBACK_PORTS.end()
    )
}
