//! Application state for the proxy server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ProxyConfig;
use crate::error::ProxyResult;
use crate::proxy::GatewayProxy;
use crate::session::{CredentialResolver, resolver_from_config};

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Proxy configuration
    pub config: ProxyConfig,
    /// Forwarder to the gateway
    pub proxy: GatewayProxy,
    started_at: Instant,
}

impl AppState {
    /// Creates state with the session resolver described by the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ProxyConfig) -> ProxyResult<Self> {
        let resolver = resolver_from_config(&config.session);
        Self::with_resolver(config, resolver)
    }

    /// Creates state with a custom credential resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_resolver(
        config: ProxyConfig,
        resolver: Arc<dyn CredentialResolver>,
    ) -> ProxyResult<Self> {
        let proxy = GatewayProxy::new(&config, resolver)?;
        Ok(Self {
            config,
            proxy,
            started_at: Instant::now(),
        })
    }

    /// Time since the state was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
