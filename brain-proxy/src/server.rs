//! Proxy server implementation.

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::routes::create_router;
use crate::state::AppState;

/// Proxy server.
pub struct ProxyServer {
    /// Server configuration
    config: ProxyConfig,
    /// Application state
    state: Arc<AppState>,
}

impl ProxyServer {
    /// Creates a new proxy server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let state = Arc::new(AppState::new(config.clone())?);
        Ok(Self { config, state })
    }

    /// Creates a new proxy server with custom state.
    #[must_use]
    pub fn with_state(config: ProxyConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Returns the router served by this server.
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ProxyError> {
        let addr = self.config.bind_address();

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| ProxyError::Server(format!("Invalid bind address {addr}: {e}")))?;

        TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ProxyError::Server(format!("Failed to bind to {addr}: {e}")))
    }

    /// Runs the proxy server until the process exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or run.
    pub async fn run(self) -> Result<(), ProxyError> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Runs the proxy server with graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or run.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ProxyError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal).await
    }

    /// Serves on an already bound listener with graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while running.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ProxyError> {
        let local = listener
            .local_addr()
            .map_or_else(|_| self.config.bind_address(), |a| a.to_string());
        info!(
            address = %local,
            gateway = %self.state.proxy.gateway_url(),
            "Proxy server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ProxyError::Server(format!("Server error: {e}")))?;

        warn!("Proxy server shutting down");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_server_with_state() {
        let config = ProxyConfig::default();
        let state = Arc::new(AppState::new(config.clone()).unwrap());
        let server = ProxyServer::with_state(config, state.clone());

        assert!(Arc::ptr_eq(server.state(), &state));
    }

    #[tokio::test]
    async fn test_rejects_bad_bind_address() {
        let config = ProxyConfig {
            host: "not an address".to_string(),
            ..Default::default()
        };
        let server = ProxyServer::new(config).unwrap();
        assert!(matches!(server.bind().await, Err(ProxyError::Server(_))));
    }

    #[tokio::test]
    async fn test_serves_health_and_shuts_down() {
        let config = ProxyConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        };
        let server = ProxyServer::new(config).unwrap();
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(listener, async {
            let _ = stop_rx.await;
        }));

        let body = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("healthy"));

        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }
}
