//! Server startup: bind, serve, hand back a handle.

use std::sync::Arc;

use fractal_runtime::Engine;

use crate::routes::{build_router, AppState};

/// Bind address configuration.
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (0 for auto-assign).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8400,
        }
    }
}

/// Handle returned by [`start`] — dropping it does not stop the server, but
/// it exposes the bound port for callers that asked for port 0.
pub struct ServerHandle {
    /// The actually bound port.
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

/// Bind the listener and serve the API in a background task.
pub async fn start(config: ServerConfig, engine: Arc<Engine>) -> Result<ServerHandle, std::io::Error> {
    let state = AppState { engine };
    let router = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "Fractal server started");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server exited");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
