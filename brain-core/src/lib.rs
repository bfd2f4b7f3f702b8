//! # Brain Core
//!
//! Shared building blocks for the Brain Link workspace.
//!
//! This crate provides:
//! - The error taxonomy shared by the channel client and the gateway proxy
//! - Configuration loading from YAML, TOML and JSON with environment overrides
//! - The `Validatable` trait implemented by every configuration section

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

/// Error types and handling
pub mod error;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConfigFormat, ConfigLoader, EnvOverride, Validatable};
    pub use crate::error::{BrainError, ConfigError, NetworkError};
}
