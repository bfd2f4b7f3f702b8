//! Configuration traits for validation and environment overrides.

use crate::error::ConfigError;

/// Trait for types that can be validated.
///
/// # Example
///
/// ```rust
/// use brain_core::config::Validatable;
/// use brain_core::error::ConfigError;
///
/// struct ListenConfig {
///     port: u16,
/// }
///
/// impl Validatable for ListenConfig {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.port == 0 {
///             return Err(ConfigError::invalid_value("port", "Port cannot be 0"));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(ListenConfig { port: 0 }.validate().is_err());
/// ```
pub trait Validatable {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Trait for types whose values can be overridden by environment variables.
///
/// `prefix` is the upper-case prefix without a trailing underscore, e.g.
/// `BRAIN` or `BRAIN_PROXY`.
pub trait Configurable {
    /// Applies environment variable overrides to this configuration.
    fn apply_env_overrides(&mut self, prefix: &str);
}
