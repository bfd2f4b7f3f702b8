//! Logging configuration types.

use brain_core::config::{Configurable, EnvOverride, Validatable};
use brain_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Configuration for the logging system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level or filter directive (e.g. "info", "`brain_proxy=debug`")
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Output targets
    #[serde(default = "default_outputs")]
    pub outputs: Vec<LogOutput>,

    /// Include thread IDs in log output
    #[serde(default)]
    pub include_thread_id: bool,

    /// Include file and line information
    #[serde(default)]
    pub include_file_info: bool,

    /// Include span enter/exit events
    #[serde(default)]
    pub include_span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            outputs: default_outputs(),
            include_thread_id: false,
            include_file_info: false,
            include_span_events: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<LogOutput> {
    vec![LogOutput::Stdout]
}

fn default_file_name() -> String {
    "brain-link.log".to_string()
}

impl Validatable for LogConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = EnvFilter::try_new(&self.level) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("'{}' is not a valid filter: {e}", self.level),
            ));
        }
        for output in &self.outputs {
            if let LogOutput::File { path, file_name, .. } = output
                && (path.is_empty() || file_name.is_empty())
            {
                return Err(ConfigError::invalid_value(
                    "logging.outputs",
                    "file output needs a directory and a file name",
                ));
            }
        }
        Ok(())
    }
}

impl Configurable for LogConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_LOG_LEVEL"), &mut self.level);
        if let Ok(format) = std::env::var(format!("{prefix}_LOG_FORMAT")) {
            match format.to_lowercase().as_str() {
                "json" => self.format = LogFormat::Json,
                "pretty" => self.format = LogFormat::Pretty,
                _ => {}
            }
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for log aggregation systems
    #[default]
    Json,
    /// Human-readable format for development
    Pretty,
}

/// Log output target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to a file in `path` with optional rotation
    File {
        /// Directory path for log files
        path: String,
        /// File name (prefix when rotating)
        #[serde(default = "default_file_name")]
        file_name: String,
        /// Rotation configuration, daily when omitted
        rotation: Option<RotationConfig>,
    },
}

/// Log rotation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationConfig {
    /// Rotate logs hourly
    Hourly,
    /// Rotate logs daily
    Daily,
    /// Never rotate (single file)
    Never,
}
