//! Gateway forwarding.
//!
//! [`GatewayProxy`] forwards one inbound request to the Brain Gateway,
//! attaching the best available credential, and relays the response.

use axum::{
    body::Body,
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue, Method,
        header::{ACCEPT_ENCODING, AUTHORIZATION, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use brain_telemetry::masking::SensitiveDataMasker;
use brain_telemetry::spans::upstream_span;
use std::sync::Arc;
use tracing::{Instrument, debug, info, warn};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::session::CredentialResolver;

/// Headers that never travel past this hop.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "host",
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Content type used when the gateway does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Where the forwarded `Authorization` header came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialSource {
    Session,
    Inbound,
    Anonymous,
}

impl CredentialSource {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Inbound => "inbound",
            Self::Anonymous => "none",
        }
    }
}

/// Stateless forwarder to the Brain Gateway.
///
/// Cheap to clone; clones share the connection pool and the resolver.
#[derive(Clone)]
pub struct GatewayProxy {
    client: reqwest::Client,
    gateway_url: String,
    resolver: Arc<dyn CredentialResolver>,
    masker: SensitiveDataMasker,
}

impl std::fmt::Debug for GatewayProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayProxy")
            .field("gateway_url", &self.gateway_url)
            .finish_non_exhaustive()
    }
}

impl GatewayProxy {
    /// Creates a proxy for the configured gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ProxyConfig, resolver: Arc<dyn CredentialResolver>) -> ProxyResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProxyError::Client(e.to_string()))?;

        Ok(Self::with_client(client, &config.gateway_url, resolver))
    }

    /// Creates a proxy around an existing HTTP client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        gateway_url: &str,
        resolver: Arc<dyn CredentialResolver>,
    ) -> Self {
        Self {
            client,
            gateway_url: gateway_url.trim().trim_end_matches('/').to_string(),
            resolver,
            masker: SensitiveDataMasker::new(),
        }
    }

    /// Returns the gateway base URL without a trailing slash.
    #[must_use]
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    /// Forwards `request` to `{gateway}/{target_path}`.
    ///
    /// The inbound query string is preserved. A session credential replaces
    /// any inbound `Authorization`; without one the inbound value is kept.
    /// Upstream status and body are relayed as-is, including non-2xx
    /// statuses. Any failure on the way becomes a 502 gateway-unavailable
    /// response, so this never fails.
    pub async fn forward(&self, request: Request, target_path: &str) -> Response {
        let method = request.method().clone();
        let span = upstream_span(method.as_str(), target_path);

        match self.try_forward(request, target_path).instrument(span).await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %method, target = %target_path, error = %e, "Gateway request failed");
                e.into_response()
            }
        }
    }

    async fn try_forward(&self, request: Request, target_path: &str) -> ProxyResult<Response> {
        let (parts, body) = request.into_parts();
        let url = self.target_url(target_path, parts.uri.query())?;

        let session = match self.resolver.resolve(&parts.headers).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Session credential unavailable, using inbound authorization");
                None
            }
        };

        let (mut headers, source) = forwarded_headers(&parts.headers, session.as_deref());
        let has_body = parts.method != Method::GET && parts.method != Method::HEAD;
        if !has_body {
            headers.remove(CONTENT_LENGTH);
        }

        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| self.masker.mask_header(AUTHORIZATION.as_str(), v).into_owned());
        debug!(
            url = %url,
            credential = source.as_str(),
            authorization = ?authorization,
            "Forwarding to gateway"
        );

        let mut upstream = self.client.request(parts.method, url).headers(headers);
        if has_body {
            upstream = upstream.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = upstream.send().await?;
        let status = upstream.status();
        let content_type = upstream
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let bytes = upstream.bytes().await?;

        info!(
            status = status.as_u16(),
            bytes = bytes.len(),
            credential = source.as_str(),
            "Gateway responded"
        );

        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(bytes))
            .map_err(|e| ProxyError::Upstream(format!("failed to build response: {e}")))
    }

    /// Joins the gateway base, `target_path` and `query` into the upstream URL.
    pub fn target_url(&self, target_path: &str, query: Option<&str>) -> ProxyResult<reqwest::Url> {
        let mut url = format!(
            "{}/{}",
            self.gateway_url,
            target_path.trim_start_matches('/')
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        reqwest::Url::parse(&url).map_err(|e| ProxyError::InvalidTarget {
            url,
            reason: e.to_string(),
        })
    }
}

/// Copies inbound headers for the upstream call and applies the credential.
fn forwarded_headers(inbound: &HeaderMap, session: Option<&str>) -> (HeaderMap, CredentialSource) {
    let mut headers = inbound.clone();

    let listed: Vec<HeaderName> = inbound
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
    for name in listed {
        headers.remove(name);
    }
    // The body is relayed without its Content-Encoding, so ask for identity.
    headers.remove(ACCEPT_ENCODING);

    let session_value = session.and_then(|token| {
        HeaderValue::from_str(&format!("Bearer {token}"))
            .inspect_err(|e| {
                warn!(error = %e, "Session credential not encodable, using inbound authorization");
            })
            .ok()
    });

    let source = match session_value {
        Some(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
            CredentialSource::Session
        }
        None if headers.contains_key(AUTHORIZATION) => CredentialSource::Inbound,
        None => CredentialSource::Anonymous,
    };

    (headers, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NoSession;
    use axum::http::header::{COOKIE, HOST};

    fn proxy(base: &str) -> GatewayProxy {
        GatewayProxy::with_client(reqwest::Client::new(), base, Arc::new(NoSession))
    }

    #[test]
    fn test_target_url_joins_without_duplicate_slashes() {
        let proxy = proxy("http://gateway:8000/");
        let url = proxy.target_url("/api/campaigns/42", None).unwrap();
        assert_eq!(url.as_str(), "http://gateway:8000/api/campaigns/42");
    }

    #[test]
    fn test_target_url_preserves_query() {
        let proxy = proxy("http://gateway:8000");
        let url = proxy
            .target_url("api/cms/pages", Some("page=2&sort=desc"))
            .unwrap();
        assert_eq!(url.as_str(), "http://gateway:8000/api/cms/pages?page=2&sort=desc");

        let empty = proxy.target_url("api/cms", Some("")).unwrap();
        assert_eq!(empty.as_str(), "http://gateway:8000/api/cms");
    }

    #[test]
    fn test_target_url_rejects_garbage_base() {
        let proxy = proxy("not a url");
        assert!(matches!(
            proxy.target_url("api/cms", None),
            Err(ProxyError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_session_credential_overrides_inbound() {
        let mut inbound = HeaderMap::new();
        inbound.insert(AUTHORIZATION, HeaderValue::from_static("Bearer X"));

        let (headers, source) = forwarded_headers(&inbound, Some("S"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer S");
        assert_eq!(source, CredentialSource::Session);
    }

    #[test]
    fn test_inbound_credential_kept_without_session() {
        let mut inbound = HeaderMap::new();
        inbound.insert(AUTHORIZATION, HeaderValue::from_static("Bearer X"));

        let (headers, source) = forwarded_headers(&inbound, None);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer X");
        assert_eq!(source, CredentialSource::Inbound);

        let (headers, source) = forwarded_headers(&HeaderMap::new(), None);
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(source, CredentialSource::Anonymous);
    }

    #[test]
    fn test_hop_by_hop_headers_stripped() {
        let mut inbound = HeaderMap::new();
        inbound.insert(HOST, HeaderValue::from_static("frontend.local"));
        inbound.insert(CONNECTION, HeaderValue::from_static("keep-alive, x-private"));
        inbound.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        inbound.insert("x-private", HeaderValue::from_static("1"));
        inbound.insert("upgrade", HeaderValue::from_static("websocket"));
        inbound.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        inbound.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        inbound.insert("x-request-id", HeaderValue::from_static("abc"));

        let (headers, _) = forwarded_headers(&inbound, None);
        for name in ["host", "connection", "keep-alive", "x-private", "upgrade", "accept-encoding"] {
            assert!(headers.get(name).is_none(), "{name} should be stripped");
        }
        assert_eq!(headers.get(COOKIE).unwrap(), "theme=dark");
        assert_eq!(headers.get("x-request-id").unwrap(), "abc");
    }

    #[test]
    fn test_unencodable_session_credential_falls_back() {
        let mut inbound = HeaderMap::new();
        inbound.insert(AUTHORIZATION, HeaderValue::from_static("Bearer X"));

        let (headers, source) = forwarded_headers(&inbound, Some("bad\ntoken"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer X");
        assert_eq!(source, CredentialSource::Inbound);

        let (headers, source) = forwarded_headers(&HeaderMap::new(), Some("bad\ntoken"));
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(source, CredentialSource::Anonymous);
    }
}
