//! Error types shared across the workspace.
//!
//! - `BrainError` - Top-level error type
//!   - `NetworkError` - Transport and handshake failures
//!   - `ConfigError` - Configuration loading and validation failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod config;
mod network;

pub use config::ConfigError;
pub use network::NetworkError;

/// Top-level error type for Brain Link.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrainError {
    /// Network-related error.
    #[error("{0}")]
    Network(#[from] NetworkError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brain_error_from_network() {
        let error: BrainError = NetworkError::Timeout { timeout_ms: 1000 }.into();
        assert!(matches!(error, BrainError::Network(NetworkError::Timeout { .. })));
        assert!(error.to_string().contains("1000ms"));
    }

    #[test]
    fn test_brain_error_from_config() {
        let error: BrainError = ConfigError::missing_field("gateway_url", "proxy").into();
        assert!(matches!(error, BrainError::Config(_)));
        assert!(error.to_string().contains("gateway_url"));
    }
}
