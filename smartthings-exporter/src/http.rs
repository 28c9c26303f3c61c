//! HTTP server for the Prometheus scrape endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::collector::SharedCollector;

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
    metrics_path: String,
}

/// Create the HTTP router.
pub fn create_router(collector: SharedCollector, metrics_path: &str) -> Router {
    let state = AppState {
        collector,
        metrics_path: metrics_path.to_string(),
    };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint. Every request runs a full collection pass.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.collector.scrape().await {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", OPENMETRICS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Scrape failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("scrape failed: {}\n", e),
            )
                .into_response()
        }
    }
}

/// Landing page linking to the metrics endpoint.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>SmartThings Exporter</title></head>\n\
         <body>\n\
         <h1>SmartThings Exporter</h1>\n\
         <p><a href='{}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        state.metrics_path
    ))
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    collector: SharedCollector,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(collector: SharedCollector, listen_addr: SocketAddr, metrics_path: String) -> Self {
        Self {
            collector,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.collector, &self.metrics_path);
        let addr = listener.local_addr()?;

        info!(
            addr = %addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                // Wait for shutdown signal
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
