//! Observer HTTP server lifecycle management.
//!
//! [`start_server`] binds to a TCP port and serves the router until the
//! future is dropped. [`spawn_server`] runs it on its own task.

use std::net::SocketAddr;
use std::sync::Arc;

use refbox_core::config::ObserverConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Start the Observer HTTP server.
///
/// Binds to the configured address, builds the router, and serves
/// requests until the future is dropped.
pub async fn start_server(config: &ObserverConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Observer server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    Ok(())
}

/// Run [`start_server`] on a background task.
///
/// The observer is not required for the match to proceed, so a server
/// failure is logged rather than propagated.
pub fn spawn_server(config: ObserverConfig, state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = start_server(&config, state).await {
            error!(error = %e, "Observer server stopped");
        }
    })
}
