//! Environment variable override helpers.

use std::collections::HashMap;

/// Helpers that overwrite a configuration value when an environment
/// variable is set and parses.
///
/// Unset or unparsable variables leave the target untouched.
pub struct EnvOverride;

impl EnvOverride {
    /// Applies an environment variable override to a string value.
    pub fn apply_string(var_name: &str, target: &mut String) {
        if let Ok(value) = std::env::var(var_name) {
            *target = value;
        }
    }

    /// Applies an environment variable override to an optional string value.
    pub fn apply_optional_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(value) = std::env::var(var_name) {
            *target = Some(value);
        }
    }

    /// Applies an environment variable override to a numeric value.
    pub fn apply_number<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(value) = std::env::var(var_name)
            && let Ok(parsed) = value.parse()
        {
            *target = parsed;
        }
    }

    /// Applies an environment variable override to a boolean value.
    pub fn apply_bool(var_name: &str, target: &mut bool) {
        if let Ok(value) = std::env::var(var_name) {
            match value.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => *target = true,
                "false" | "0" | "no" | "off" => *target = false,
                _ => {}
            }
        }
    }

    /// Applies a comma separated list, e.g. `campaigns,cms,agents`.
    pub fn apply_list(var_name: &str, target: &mut Vec<String>) {
        if let Ok(value) = std::env::var(var_name) {
            *target = value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Applies a map in the form `KEY1=VALUE1,KEY2=VALUE2`.
    pub fn apply_map(var_name: &str, target: &mut HashMap<String, String>) {
        if let Ok(value) = std::env::var(var_name) {
            for pair in value.split(',') {
                if let Some((k, v)) = pair.split_once('=') {
                    target.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }
    }
}
