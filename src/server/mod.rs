//! HTTP control surface and live status stream.
//!
//! | Route                 | Handler                      |
//! |-----------------------|------------------------------|
//! | `POST /api/start`     | launch a campaign            |
//! | `POST /api/stop`      | request a graceful stop      |
//! | `GET /api/status`     | current status snapshot      |
//! | `POST /api/close-session` | stop and release the browser |
//! | `GET /health`         | liveness                     |
//! | `GET /ws`             | status snapshots over WebSocket |

pub mod api;
pub mod ws;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::campaign::Orchestrator;
use api::{AppState, SharedState};

/// Configuration for the control server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            dev_mode: false,
        }
    }
}

/// Build the full application router with API and WebSocket routes.
pub fn build_router(state: SharedState, dev_mode: bool) -> Router {
    let mut app = api::api_router()
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if dev_mode {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Serve until Ctrl+C / SIGTERM, then shut the orchestrator down so the
/// browser session is released before the process exits.
pub async fn start_server(config: ServerConfig, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let state = Arc::new(AppState {
        orchestrator: Arc::clone(&orchestrator),
    });
    let app = build_router(state, config.dev_mode);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, "control server listening");
    println!("Outreach control server running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    orchestrator.shutdown().await;
    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("received shutdown signal, starting graceful shutdown");
}
