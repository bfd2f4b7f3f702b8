//! Proxy error types.
//!
//! Every failure on the forwarding path renders as the gateway-unavailable
//! body. A resource outside the configured allow list renders as 404.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message carried in the `error` field of every 502 body.
pub const GATEWAY_UNAVAILABLE: &str = "Gateway unavailable";

/// Proxy error type.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The upstream URL could not be built
    #[error("invalid upstream url {url}: {reason}")]
    InvalidTarget {
        /// Offending URL
        url: String,
        /// Parse failure
        reason: String,
    },

    /// The gateway could not be reached or the exchange failed
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The gateway did not answer within the configured timeout
    #[error("upstream request timed out")]
    Timeout,

    /// The session credential could not be resolved
    #[error("session rejected: {0}")]
    Session(String),

    /// The requested resource is not forwarded
    #[error("resource not found: {0}")]
    ResourceNotAllowed(String),

    /// The HTTP client could not be constructed
    #[error("http client error: {0}")]
    Client(String),

    /// The listener failed to bind or serve
    #[error("server error: {0}")]
    Server(String),
}

impl ProxyError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotAllowed(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns the value of the `error` field in the response body.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ResourceNotAllowed(_) => "Not found",
            _ => GATEWAY_UNAVAILABLE,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Upstream(e.to_string())
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayErrorBody {
    /// Error label
    pub error: String,
    /// Error details
    pub details: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = GatewayErrorBody {
            error: self.label().to_string(),
            details: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;
