//! # Brain Telemetry
//!
//! Logging and tracing for the Brain Link services.
//!
//! This crate provides:
//! - Structured logging with JSON and pretty formats
//! - Rolling file output
//! - Span constructors for channel connections and proxied requests
//! - Masking of bearer tokens, JWTs and session secrets

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Sensitive data masking
pub mod masking;

/// Span definitions
pub mod spans;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, LoggingError, init_logging};
    pub use crate::masking::SensitiveDataMasker;
    pub use crate::spans::*;
}
