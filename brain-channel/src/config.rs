//! Channel client configuration.

use brain_core::config::Validatable;
use brain_core::error::{ConfigError, NetworkError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::machine::RetryPolicy;

/// Configuration for one channel subscription.
///
/// The endpoint is `{base_url}/{channel}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Base WebSocket URL of the gateway, e.g. `ws://localhost:8000/ws`.
    pub base_url: String,

    /// Logical channel name, e.g. `market-data`.
    pub channel: String,

    /// Whether the client reconnects after an unexpected close.
    #[serde(default = "default_reconnect_enabled")]
    pub reconnect_enabled: bool,

    /// Delay before each reconnection attempt in milliseconds.
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Upper bound for the delay when a backoff multiplier is set.
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Growth factor applied per consecutive failed attempt (1.0 = fixed delay).
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Handshake timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Additional headers for the WebSocket handshake.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_reconnect_enabled() -> bool {
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

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            channel: String::new(),
            reconnect_enabled: default_reconnect_enabled(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            connect_timeout_ms: default_connect_timeout_ms(),
            headers: HashMap::new(),
        }
    }
}

impl ChannelConfig {
    /// Creates a new builder for `ChannelConfig`.
    #[must_use]
    pub fn builder() -> ChannelConfigBuilder {
        ChannelConfigBuilder::default()
    }

    /// Returns the connection timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the base reconnect interval as a Duration.
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Returns the retry policy derived from this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            enabled: self.reconnect_enabled,
            interval: self.reconnect_interval(),
            multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_reconnect_delay_ms),
        }
    }

    /// Joins base URL and channel into the endpoint URL.
    ///
    /// Slashes at the seam are collapsed so `ws://h/ws/` + `/market-data`
    /// yields `ws://h/ws/market-data`.
    pub fn endpoint_url(&self) -> Result<String, NetworkError> {
        let base = self.base_url.trim().trim_end_matches('/');
        let channel = self.channel.trim().trim_matches('/');

        if !(base.starts_with("ws://") || base.starts_with("wss://")) {
            return Err(NetworkError::InvalidEndpoint {
                url: self.base_url.clone(),
                reason: "scheme must be ws or wss".to_string(),
            });
        }
        if channel.is_empty() {
            return Err(NetworkError::InvalidEndpoint {
                url: self.base_url.clone(),
                reason: "channel is empty".to_string(),
            });
        }

        Ok(format!("{base}/{channel}"))
    }
}

impl Validatable for ChannelConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.trim().trim_matches('/').is_empty() {
            return Err(ConfigError::missing_field("channel", "channel"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::missing_field("base_url", "channel"));
        }
        if let Err(e) = self.endpoint_url() {
            return Err(ConfigError::invalid_value("channel.base_url", e.reason()));
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

/// Builder for `ChannelConfig`.
#[derive(Debug, Default)]
pub struct ChannelConfigBuilder {
    base_url: Option<String>,
    channel: Option<String>,
    reconnect_enabled: Option<bool>,
    reconnect_interval_ms: Option<u64>,
    max_reconnect_delay_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
    connect_timeout_ms: Option<u64>,
    headers: HashMap<String, String>,
}

impl ChannelConfigBuilder {
    /// Sets the base WebSocket URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the channel name.
    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Sets whether reconnection is enabled.
    #[must_use]
    pub fn reconnect_enabled(mut self, enabled: bool) -> Self {
        self.reconnect_enabled = Some(enabled);
        self
    }

    /// Sets the reconnect interval.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Sets the maximum reconnection delay.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Adds a handshake header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Builds the `ChannelConfig`.
    #[must_use]
    pub fn build(self) -> ChannelConfig {
        ChannelConfig {
            base_url: self.base_url.unwrap_or_default(),
            channel: self.channel.unwrap_or_default(),
            reconnect_enabled: self
                .reconnect_enabled
                .unwrap_or_else(default_reconnect_enabled),
            reconnect_interval_ms: self
                .reconnect_interval_ms
                .unwrap_or_else(default_reconnect_interval_ms),
            max_reconnect_delay_ms: self
                .max_reconnect_delay_ms
                .unwrap_or_else(default_max_reconnect_delay_ms),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or_else(default_backoff_multiplier),
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or_else(default_connect_timeout_ms),
            headers: self.headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ChannelConfig::builder()
            .base_url("wss://gateway.example.com/ws")
            .channel("portfolio")
            .reconnect_interval(Duration::from_millis(500))
            .connect_timeout(Duration::from_secs(2))
            .header("x-brand", "acme")
            .build();

        assert_eq!(config.channel, "portfolio");
        assert_eq!(config.reconnect_interval(), Duration::from_millis(500));
        assert_eq!(config.connect_timeout(), Duration::from_secs(2));
        assert_eq!(config.headers.get("x-brand").map(String::as_str), Some("acme"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_defaults() {
        let config = ChannelConfig::default();

        assert!(config.reconnect_enabled);
        assert_eq!(config.reconnect_interval_ms, 3_000);
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert!((config.backoff_multiplier - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_endpoint_url_collapses_slashes() {
        let config = ChannelConfig::builder()
            .base_url("ws://localhost:8000/ws/")
            .channel("/market-data")
            .build();
        assert_eq!(
            config.endpoint_url().unwrap(),
            "ws://localhost:8000/ws/market-data"
        );
    }

    #[test]
    fn test_endpoint_url_rejects_http_scheme() {
        let config = ChannelConfig::builder()
            .base_url("http://localhost:8000/ws")
            .channel("signals")
            .build();
        assert!(matches!(
            config.endpoint_url(),
            Err(NetworkError::InvalidEndpoint { .. })
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_channel_is_config_error() {
        let config = ChannelConfig::builder()
            .base_url("ws://localhost:8000/ws")
            .channel("  ")
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_invalid_retry_settings() {
        let base = ChannelConfig::builder()
            .base_url("ws://localhost:8000/ws")
            .channel("signals");

        let zero_interval = ChannelConfig {
            reconnect_interval_ms: 0,
            ..base.build()
        };
        assert!(zero_interval.validate().is_err());

        let shrinking = ChannelConfig::builder()
            .base_url("ws://localhost:8000/ws")
            .channel("signals")
            .backoff_multiplier(0.5)
            .build();
        assert!(shrinking.validate().is_err());
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let json = r#"{"base_url":"ws://localhost:8000/ws","channel":"market-data"}"#;
        let config: ChannelConfig = serde_json::from_str(json).unwrap();

        assert!(config.reconnect_enabled);
        assert_eq!(config.reconnect_interval_ms, 3_000);
        assert!(config.headers.is_empty());
    }
}
