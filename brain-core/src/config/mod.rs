//! Configuration management module.
//!
//! This module provides:
//! - YAML, TOML and JSON configuration file formats
//! - Validation through the [`Validatable`] trait
//! - Environment variable overrides through [`Configurable`] and [`EnvOverride`]
//!
//! # Example
//!
//! ```rust,ignore
//! use brain_core::config::ConfigLoader;
//!
//! let config: ServerConfig = ConfigLoader::new()
//!     .with_env_prefix("BRAIN")
//!     .load("brain.yaml")?;
//! ```

mod env;
mod loader;
mod traits;

pub use env::EnvOverride;
pub use loader::{ConfigFormat, ConfigLoader};
pub use traits::{Configurable, Validatable};
