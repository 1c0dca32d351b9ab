//! shelter server entry point.
//!
//! Loads configuration, registers the worker for the configured version and
//! serves the cache tools over MCP stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shelter_client::{FetchClient, FetchConfig};
use shelter_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(mode = %config.mode, version = %config.version, origin = %config.origin, "starting shelter on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let state = Arc::new(state::HostState::new(config, db, network));

    if let Err(e) = state.register().await {
        tracing::warn!(error = %e, "initial registration failed; sw_install can retry");
    }

    let handler = handler::ShelterServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
