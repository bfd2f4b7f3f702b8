//! Network-related error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network error covering connection failures, timeouts, invalid endpoints
/// and WebSocket protocol errors.
///
/// # Examples
///
/// ```
/// use brain_core::error::NetworkError;
///
/// let error = NetworkError::ConnectionFailed {
///     reason: "Connection refused".to_string(),
/// };
/// assert!(error.to_string().contains("Connection refused"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkError {
    /// Connection to remote host failed.
    #[error("[Network] Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// Connection timed out.
    #[error("[Network] Connection timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The endpoint URL could not be used to build a transport.
    #[error("[Network] Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// Offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// WebSocket protocol error.
    #[error("[Network] WebSocket error: {reason}")]
    WebSocket {
        /// Reason for the WebSocket error.
        reason: String,
    },

    /// Connection was closed.
    #[error("[Network] Connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the connection closure.
        reason: String,
    },
}

impl NetworkError {
    /// Returns the human readable reason without the category prefix.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::ConnectionFailed { reason }
            | Self::WebSocket { reason }
            | Self::ConnectionClosed { reason } => reason.clone(),
            Self::InvalidEndpoint { url, reason } => format!("{url}: {reason}"),
            Self::Timeout { timeout_ms } => format!("timed out after {timeout_ms}ms"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout() {
        let error = NetworkError::Timeout { timeout_ms: 5000 };
        assert!(error.to_string().contains("5000ms"));
    }

    #[test]
    fn test_invalid_endpoint_reason() {
        let error = NetworkError::InvalidEndpoint {
            url: "not a url".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(error.reason(), "not a url: relative URL without a base");
    }

    #[test]
    fn test_reason_strips_prefix() {
        let error = NetworkError::ConnectionFailed {
            reason: "dns error".to_string(),
        };
        assert_eq!(error.reason(), "dns error");
        assert!(error.to_string().starts_with("[Network]"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let error = NetworkError::ConnectionClosed {
            reason: "server going away".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        let parsed: NetworkError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, parsed);
    }
}
