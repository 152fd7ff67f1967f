//! play9-server entry point: parses configuration, restores any tables
//! left on disk, and serves the HTTP/WS surface (spec.md §4.F).

mod config;
mod error;
mod http;
mod hub;
mod message;
mod persistence;
mod registry;
mod session;
mod snapshot;
mod time;
mod validation;

use crate::config::Config;
use crate::registry::Registry;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Arc::new(Config::from_env()?);
    let registry = Registry::new(Arc::clone(&config));
    registry.restore_from_disk()?;

    let app = http::router(Arc::clone(&registry));
    let addr = std::net::SocketAddr::from((config.listen_addr, config.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("play9-server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
