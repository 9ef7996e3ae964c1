//! HTTP server exposing the camera.
//!
//! | Route       | Response                                  |
//! |-------------|-------------------------------------------|
//! | `/stream`   | `multipart/x-mixed-replace` JPEG sequence |
//! | `/snapshot` | one `image/jpeg`                          |
//! | `/metrics`  | Prometheus text format                    |
//! | `/health`   | `OK`                                      |

mod routes;

use crate::capture::SharedSource;
use crate::config::Config;
use crate::metrics::StreamMetrics;
use axum::{routing::get, Router};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Errors that can occur during server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// State shared by every request handler.
pub struct AppState {
    pub source: SharedSource,
    pub config: Arc<Config>,
    pub metrics: Arc<StreamMetrics>,
}

/// Builds the router for the given shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/stream", get(routes::stream_handler))
        .route("/snapshot", get(routes::snapshot_handler))
        .route("/metrics", get(routes::metrics_handler))
        .route("/health", get(routes::health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP server for the camera stream.
pub struct StreamServer {
    state: Arc<AppState>,
}

impl StreamServer {
    /// Creates a new server. The capture source must already be open.
    pub fn new(source: SharedSource, config: Arc<Config>, metrics: Arc<StreamMetrics>) -> Self {
        Self {
            state: Arc::new(AppState {
                source,
                config,
                metrics,
            }),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Binds the configured address, resolving a host name if needed.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        Ok(TcpListener::bind(self.state.config.bind_addr()).await?)
    }

    /// Serves on `listener` until `shutdown` resolves.
    ///
    /// Stream responses never finish on their own, so shutdown drops open
    /// connections instead of draining them.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr: SocketAddr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Camera server listening");
        tracing::info!("Stream endpoint: http://{}/stream", addr);
        tracing::info!("Snapshot endpoint: http://{}/snapshot", addr);

        let app = router(self.state);
        tokio::select! {
            result = axum::serve(listener, app).into_future() => {
                result.map_err(|e| ServerError::Server(e.to_string()))
            }
            () = shutdown => {
                tracing::info!("Shutting down");
                Ok(())
            }
        }
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{share, MockCamera};

    fn server_for(config: Config) -> StreamServer {
        StreamServer::new(
            share(MockCamera::default()),
            Arc::new(config),
            Arc::new(StreamMetrics::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_bind_uses_configured_port() {
        let mut config = Config::default();
        config.server.listen = "127.0.0.1".to_string();
        config.server.port = 0;

        let listener = server_for(config).bind().await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_bind_resolves_host_name() {
        let mut config = Config::default();
        config.server.listen = "localhost".to_string();
        config.server.port = 0;

        let listener = server_for(config).bind().await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }
}
