//! Configuration errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration file that could not be used, or a section that failed
/// validation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// A required value is absent or blank.
    #[error("[Config] Missing '{field}' in section '{section}'")]
    MissingField {
        /// Field name.
        field: String,
        /// Section holding the field, e.g. `proxy.session`.
        section: String,
    },

    /// A value is present but unusable.
    #[error("[Config] Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted path of the field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The file could not be read.
    #[error("[Config] Cannot read '{path}': {reason}")]
    Unreadable {
        /// File path.
        path: String,
        /// I/O error text.
        reason: String,
    },

    /// The content is not valid YAML, TOML or JSON for the target type.
    #[error("[Config] Cannot parse '{path}': {reason}")]
    Malformed {
        /// File path, or `<string>` for inline content.
        path: String,
        /// Parser error text.
        reason: String,
    },
}

impl ConfigError {
    /// `field` is missing from `section`.
    #[must_use]
    pub fn missing_field(field: impl Into<String>, section: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            section: section.into(),
        }
    }

    /// `field` holds an unusable value.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_section() {
        let error = ConfigError::missing_field("secret", "proxy.session");
        assert_eq!(
            error.to_string(),
            "[Config] Missing 'secret' in section 'proxy.session'"
        );
    }

    #[test]
    fn test_invalid_value() {
        let error = ConfigError::invalid_value("proxy.port", "must be non-zero");
        assert!(matches!(error, ConfigError::InvalidValue { .. }));
        assert!(error.to_string().ends_with("must be non-zero"));
    }
}
