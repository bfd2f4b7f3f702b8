//! Session credential resolution.
//!
//! The frontend keeps the gateway access token inside a signed session
//! cookie. The proxy unwraps it per request and forwards it as a bearer
//! token; see [`crate::GatewayProxy::forward`].

use async_trait::async_trait;
use axum::http::{HeaderMap, header::COOKIE};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::{ProxyError, ProxyResult};

/// Source of the session credential for an inbound request.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Returns the gateway access token for the request, if any.
    async fn resolve(&self, headers: &HeaderMap) -> ProxyResult<Option<String>>;
}

/// Resolver used when sessions are not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

#[async_trait]
impl CredentialResolver for NoSession {
    async fn resolve(&self, _headers: &HeaderMap) -> ProxyResult<Option<String>> {
        Ok(None)
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Gateway access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// HS256 keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    /// Creates keys from a shared secret.
    #[must_use]
    pub fn new(secret: &str, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Creates keys from configuration. Returns `None` without a secret.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Option<Self> {
        config
            .secret()
            .map(|secret| Self::new(secret, config.issuer.clone(), config.audience.clone()))
    }

    /// Issues a session token valid for `ttl_secs` seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails.
    pub fn issue(
        &self,
        subject: &str,
        access_token: Option<&str>,
        ttl_secs: i64,
    ) -> ProxyResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
            access_token: access_token.map(str::to_string),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ProxyError::Session(format!("failed to issue session: {e}")))
    }

    /// Validates a session token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, forged or expired.
    pub fn validate(&self, token: &str) -> ProxyResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data: TokenData<SessionClaims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| ProxyError::Session(format!("invalid session: {e}")))?;

        Ok(token_data.claims)
    }
}

/// Resolves the access token stored in the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCookieResolver {
    cookie_name: String,
    keys: SessionKeys,
}

impl SessionCookieResolver {
    /// Creates a resolver reading `cookie_name`.
    #[must_use]
    pub fn new(cookie_name: impl Into<String>, keys: SessionKeys) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            keys,
        }
    }

    /// Returns the cookie name this resolver reads.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

#[async_trait]
impl CredentialResolver for SessionCookieResolver {
    async fn resolve(&self, headers: &HeaderMap) -> ProxyResult<Option<String>> {
        let Some(token) = cookie_value(headers, &self.cookie_name) else {
            return Ok(None);
        };

        let claims = self.keys.validate(token)?;
        Ok(claims.access_token.filter(|t| !t.is_empty()))
    }
}

/// Builds the resolver described by `config`.
///
/// Without a secret every request resolves to no session credential.
#[must_use]
pub fn resolver_from_config(config: &SessionConfig) -> Arc<dyn CredentialResolver> {
    match SessionKeys::from_config(config) {
        Some(keys) => Arc::new(SessionCookieResolver::new(config.cookie_name.clone(), keys)),
        None => Arc::new(NoSession),
    }
}

/// Finds a cookie by name across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}
