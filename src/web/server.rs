//! Health endpoint for the hosting platform's liveness probe

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tracing::info;

pub fn router() -> Router {
    Router::new().route("/", get(health))
}

/// Serve the health endpoint on `0.0.0.0:port` until the process exits
pub async fn start_health_server(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Health endpoint listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router()).await?;
    Ok(())
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}
