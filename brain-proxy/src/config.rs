//! Proxy configuration types.
//!
//! This module provides configuration for the proxy server including:
//! - Listen address and upstream gateway URL
//! - Session cookie verification settings
//! - CORS settings

use brain_core::config::{Configurable, EnvOverride, Validatable};
use brain_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Proxy server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the Brain Gateway, e.g. `http://localhost:8000`
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Resources that may be forwarded under `/api/{resource}`.
    /// Empty means every resource.
    #[serde(default)]
    pub resources: Vec<String>,

    /// Upstream request timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Session cookie configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            gateway_url: default_gateway_url(),
            resources: Vec::new(),
            timeout_secs: None,
            session: SessionConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Returns the server bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the upstream timeout, if one is configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Returns true if `resource` may be forwarded.
    #[must_use]
    pub fn allows(&self, resource: &str) -> bool {
        self.resources.is_empty() || self.resources.iter().any(|r| r == resource)
    }
}

impl Validatable for ProxyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let gateway = self.gateway_url.trim();
        if gateway.is_empty() {
            return Err(ConfigError::missing_field("gateway_url", "proxy"));
        }
        if !(gateway.starts_with("http://") || gateway.starts_with("https://")) {
            return Err(ConfigError::invalid_value(
                "proxy.gateway_url",
                "scheme must be http or https",
            ));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::missing_field("host", "proxy"));
        }
        if self.resources.iter().any(|r| r.trim().is_empty() || r.contains('/')) {
            return Err(ConfigError::invalid_value(
                "proxy.resources",
                "resource names must be non-empty path segments",
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::invalid_value(
                "proxy.timeout_secs",
                "must be greater than 0",
            ));
        }
        self.session.validate()?;
        self.cors.validate()
    }
}

impl Configurable for ProxyConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_string(&format!("{prefix}_HOST"), &mut self.host);
        EnvOverride::apply_number(&format!("{prefix}_PORT"), &mut self.port);
        EnvOverride::apply_string(&format!("{prefix}_GATEWAY_URL"), &mut self.gateway_url);
        EnvOverride::apply_list(&format!("{prefix}_PROXY_RESOURCES"), &mut self.resources);
        self.session.apply_env_overrides(prefix);
    }
}

/// Session cookie verification settings.
///
/// Sessions are HS256 tokens carrying the gateway access token in an
/// `access_token` claim. Without a secret no session credential is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Signing secret. Usually supplied through `BRAIN_SESSION_SECRET`.
    #[serde(default)]
    pub secret: Option<String>,

    /// Expected issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Expected audience claim
    #[serde(default = "default_audience")]
    pub audience: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secret: None,
            issuer: default_issuer(),
            audience: default_audience(),
        }
    }
}

impl SessionConfig {
    /// Returns the configured secret when it is non-empty.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

impl Validatable for SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.secret().is_some() && self.cookie_name.trim().is_empty() {
            return Err(ConfigError::missing_field(
                "cookie_name",
                "proxy.session",
            ));
        }
        Ok(())
    }
}

impl Configurable for SessionConfig {
    fn apply_env_overrides(&mut self, prefix: &str) {
        EnvOverride::apply_optional_string(&format!("{prefix}_SESSION_SECRET"), &mut self.secret);
        EnvOverride::apply_string(&format!("{prefix}_SESSION_COOKIE"), &mut self.cookie_name);
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Enable CORS
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Allowed origins (empty means all origins)
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Allow credentials. Requires explicit origins.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Max age for preflight cache in seconds
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec![],
            allow_credentials: false,
            max_age_secs: default_max_age(),
        }
    }
}

impl Validatable for CorsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.allow_credentials && self.allowed_origins.is_empty() {
            return Err(ConfigError::invalid_value(
                "proxy.cors.allow_credentials",
                "credentials require explicit allowed_origins",
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_gateway_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_cookie_name() -> String {
    "brain_session".to_string()
}

fn default_issuer() -> String {
    "brain-link".to_string()
}

fn default_audience() -> String {
    "brain-gateway".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_age() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.gateway_url, "http://localhost:8000");
        assert!(config.timeout().is_none());
        assert!(config.session.secret().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_allows_every_resource_when_list_empty() {
        let config = ProxyConfig::default();
        assert!(config.allows("campaigns"));
        assert!(config.allows("anything"));
    }

    #[test]
    fn test_allow_list() {
        let config = ProxyConfig {
            resources: vec!["campaigns".to_string(), "cms".to_string()],
            ..Default::default()
        };
        assert!(config.allows("cms"));
        assert!(!config.allows("agents"));
    }

    #[test]
    fn test_rejects_non_http_gateway() {
        let config = ProxyConfig {
            gateway_url: "ws://localhost:8000".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let empty = ProxyConfig {
            gateway_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            empty.validate(),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_timeout_and_bad_resource() {
        let zero = ProxyConfig {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let nested = ProxyConfig {
            resources: vec!["a/b".to_string()],
            ..Default::default()
        };
        assert!(nested.validate().is_err());
    }

    #[test]
    fn test_empty_secret_counts_as_unset() {
        let session = SessionConfig {
            secret: Some(String::new()),
            ..Default::default()
        };
        assert!(session.secret().is_none());
    }

    #[test]
    fn test_cors_credentials_need_origins() {
        let cors = CorsConfig {
            allow_credentials: true,
            ..Default::default()
        };
        assert!(cors.validate().is_err());

        let cors = CorsConfig {
            allow_credentials: true,
            allowed_origins: vec!["https://app.example.com".to_string()],
            ..Default::default()
        };
        assert!(cors.validate().is_ok());
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let json = r#"{"gateway_url":"https://gateway.example.com","resources":["campaigns"]}"#;
        let config: ProxyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.resources, vec!["campaigns".to_string()]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.session.cookie_name, "brain_session");
        assert!(config.cors.enabled);
    }

    #[test]
    fn test_env_overrides() {
        // SAFETY: variable names are unique to this test.
        unsafe {
            std::env::set_var("BRAINPROXYTEST_GATEWAY_URL", "https://gw.internal");
            std::env::set_var("BRAINPROXYTEST_PORT", "4100");
            std::env::set_var("BRAINPROXYTEST_SESSION_SECRET", "s3cret");
        }

        let mut config = ProxyConfig::default();
        config.apply_env_overrides("BRAINPROXYTEST");

        assert_eq!(config.gateway_url, "https://gw.internal");
        assert_eq!(config.port, 4100);
        assert_eq!(config.session.secret(), Some("s3cret"));
    }
}
