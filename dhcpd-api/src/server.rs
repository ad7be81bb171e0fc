//! Listener configuration and serve loop.

use axum::Router;
use axum::http::StatusCode;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::rest::{AppState, create_router};

/// Server configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("listen address {0} is not a loopback address")]
    NotLoopback(SocketAddr),

    #[error("{0} timeout must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Listener address and request timeouts.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Limit for receiving a request body.
    pub read_timeout: Duration,
    /// Limit for producing a response, including store and engine calls.
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 22222)),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.listen.ip().is_loopback() {
            return Err(ConfigError::NotLoopback(self.listen));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("read"));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("write"));
        }
        Ok(())
    }
}

/// Router with request tracing and the configured timeouts applied.
pub fn build_app(state: Arc<AppState>, config: &ServerConfig) -> Router {
    create_router(state)
        .layer(RequestBodyTimeoutLayer::new(config.read_timeout))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.write_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn run<F>(config: &ServerConfig, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.listen).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
