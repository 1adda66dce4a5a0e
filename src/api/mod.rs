pub mod routes;

use crate::config::Config;
use crate::store::StoreHandle;
use anyhow::{Context, Result};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub async fn run_server(config: Arc<Config>) -> Result<()> {
    let port = config.api_port;
    let store = Arc::new(StoreHandle::new(config.as_ref().clone()));
    let state = routes::ApiState { config, store };
    let app: Router = routes::router(state);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))?;

    info!(address = %addr, "PointTracker API server started");

    axum::serve(listener, app)
        .await
        .context("API server failed")?;

    Ok(())
}
