//! Gateway forwarding handler.
//!
//! ANY /api/{resource}
//! ANY /api/{resource}/{*path}

use axum::{
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::ProxyError;
use crate::state::AppState;

/// Forwards an `/api/...` request to the same path on the gateway.
///
/// The inbound path is forwarded verbatim (still percent-encoded), so the
/// gateway sees exactly what the client sent.
pub async fn forward_api(
    State(state): State<Arc<AppState>>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
) -> Response {
    let resource = params.get("resource").map_or("", String::as_str);
    if !state.config.allows(resource) {
        debug!(resource = %resource, "Resource not forwarded");
        return ProxyError::ResourceNotAllowed(resource.to_string()).into_response();
    }

    let target_path = request.uri().path().to_string();
    state.proxy.forward(request, &target_path).await
}
