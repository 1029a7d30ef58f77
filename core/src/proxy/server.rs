//! Dev Server - Axum HTTP front end

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::proxy::rule::RuleSet;
use crate::proxy::upstream::client::UpstreamClient;

/// Application state shared across handlers. Read-only after startup;
/// concurrent requests share it without coordination.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleSet>,
    pub upstream: Arc<UpstreamClient>,
    pub static_files: ServeDir,
}

/// Dev server instance
pub struct ProxyServer {
    host: String,
    port: u16,
    state: AppState,
}

impl ProxyServer {
    pub fn new(config: &Config, rules: RuleSet) -> Self {
        let upstream = Arc::new(UpstreamClient::new(&config.timeouts));
        let static_root = crate::config::expand_path(&config.static_files.root);

        let state = AppState {
            rules: Arc::new(rules),
            upstream,
            static_files: ServeDir::new(static_root),
        };

        Self {
            host: config.server.bind_address().to_string(),
            port: config.server.port,
            state,
        }
    }

    /// Build the request router. There are no fixed routes: everything
    /// funnels through the fallback so rule matching sees every path.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(crate::proxy::handlers::forward::handle_request)
            .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the dev server (blocking)
    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("Dev server listening on {}", addr);

        // Handle graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Dev server stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
