//! Server configuration.
//!
//! One file configures logging, the proxy and the channel defaults:
//!
//! ```yaml
//! logging:
//!   level: info
//!   format: pretty
//! proxy:
//!   port: 3000
//!   gateway_url: http://localhost:8000
//!   resources: [campaigns, cms, agents]
//! channel:
//!   base_url: ws://localhost:8000/ws
//!   reconnect_interval_ms: 3000
//! ```

use brain_channel::ChannelConfig;
use brain_core::config::{Configurable, EnvOverride, Validatable};
use brain_core::error::ConfigError;
use brain_proxy::ProxyConfig;
use brain_telemetry::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Environment variable prefix for every override.
pub const ENV_PREFIX: &str = "BRAIN";

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,

    /// Gateway proxy configuration
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Defaults for channel clients
    #[serde(default)]
    pub channel: ChannelDefaults,
}

impl Validatable for ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        self.proxy.validate()?;
        self.channel.validate()
    }
}

impl Configurable for ServerConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        self.logging.apply_env_overrides(prefix);
        self.proxy.apply_env_overrides(prefix);
        self.channel.apply_env_overrides(prefix);
    }
}

/// Settings shared by every channel client; the channel name is chosen
/// per subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDefaults {
    /// Base WebSocket URL of the gateway
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Reconnect after unexpected closes
    #[serde(default = "default_true")]
    pub reconnect_enabled: bool,

    /// Delay before each reconnection attempt in milliseconds
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Upper bound for the delay when backing off
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Growth factor per consecutive failed attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Handshake timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Extra handshake headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for ChannelDefaults {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            reconnect_enabled: true,
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            connect_timeout_ms: default_connect_timeout_ms(),
            headers: HashMap::new(),
        }
    }
}

impl ChannelDefaults {
    /// Builds the client configuration for `channel`.
    #[must_use]
    pub fn for_channel(&self, channel: &str) -> ChannelConfig {
        let builder = self.headers.iter().fold(
            ChannelConfig::builder()
                .base_url(self.base_url.clone())
                .channel(channel)
                .reconnect_enabled(self.reconnect_enabled)
                .reconnect_interval(Duration::from_millis(self.reconnect_interval_ms))
                .max_reconnect_delay(Duration::from_millis(self.max_reconnect_delay_ms))
                .backoff_multiplier(self.backoff_multiplier)
                .connect_timeout(Duration::from_millis(self.connect_timeout_ms)),
            |builder, (k, v)| builder.header(k.clone(), v.clone()),
        );
        builder.build()
    }
}

impl Validatable for ChannelDefaults {
    fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::missing_field("base_url", "channel"));
        }
        if !(base.starts_with("ws://") || base.starts_with("wss://")) {
            return Err(ConfigError::invalid_value(
                "channel.base_url",
                "scheme must be ws or wss",
            ));
        }
        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::invalid_value(
                "channel.reconnect_interval_ms",
                "must be greater than 0",
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid_value(
                "channel.backoff_multiplier",
                "must be a finite number >= 1.0",
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "channel.connect_timeout_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Configurable for ChannelDefaults {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_WS_URL"), &mut self.base_url);
        EnvOverride::apply_bool(
            &format!("{prefix}_RECONNECT_ENABLED"),
            &mut self.reconnect_enabled,
        );
        EnvOverride::apply_number(
            &format!("{prefix}_RECONNECT_INTERVAL_MS"),
            &mut self.reconnect_interval_ms,
        );
        EnvOverride::apply_map(&format!("{prefix}_WS_HEADERS"), &mut self.headers);
    }
}

fn default_base_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_true() -> bool {
    true
}

fn default_reconnect_interval_ms() -> u64 {
    3_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}
