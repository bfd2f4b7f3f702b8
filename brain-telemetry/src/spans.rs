//! Span definitions for the channel client and the gateway proxy.

use tracing::{Span, info_span};

/// Create a span for an inbound HTTP request.
///
/// # Example
///
/// ```
/// use brain_telemetry::spans::request_span;
///
/// let span = request_span("req-123", "GET", "/api/campaigns");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn request_span(request_id: &str, method: &str, path: &str) -> Span {
    info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        otel.kind = "server"
    )
}

/// Create a span for one forwarded call to the gateway.
#[must_use]
pub fn upstream_span(method: &str, target: &str) -> Span {
    info_span!(
        "upstream",
        method = %method,
        target = %target,
        otel.kind = "client"
    )
}

/// Create a span covering the lifetime of a channel connection driver.
#[must_use]
pub fn channel_span(channel: &str, url: &str) -> Span {
    info_span!(
        "channel",
        channel = %channel,
        url = %url,
        otel.kind = "client"
    )
}
