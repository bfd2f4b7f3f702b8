//! # Brain Proxy
//!
//! Authenticated reverse proxy that forwards frontend API calls to the
//! Brain Gateway.
//!
//! This crate provides:
//! - [`GatewayProxy`], the stateless forwarder with credential injection
//! - [`CredentialResolver`] implementations for session cookies
//! - The axum router, request-id middleware and server wrapper
//!
//! # Example
//!
//! ```rust,ignore
//! use brain_proxy::{ProxyConfig, ProxyServer};
//!
//! let server = ProxyServer::new(ProxyConfig::default())?;
//! server.run_with_shutdown(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;

pub use config::{CorsConfig, ProxyConfig, SessionConfig};
pub use error::{GatewayErrorBody, ProxyError, ProxyResult};
pub use proxy::GatewayProxy;
pub use routes::create_router;
pub use server::ProxyServer;
pub use session::{
    CredentialResolver, NoSession, SessionClaims, SessionCookieResolver, SessionKeys,
    resolver_from_config,
};
pub use state::AppState;
