//! Proxy route definitions.

use axum::{
    Router,
    http::HeaderValue,
    routing::{any, get},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::CorsConfig;
use crate::handlers::{gateway, health};
use crate::middleware::RequestIdLayer;
use crate::state::AppState;

/// Creates the proxy router with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.cors);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/{resource}", any(gateway::forward_api))
        .route("/api/{resource}/{*path}", any(gateway::forward_api))
        .layer(cors)
        .layer(RequestIdLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        return CorsLayer::new();
    }

    let cors = CorsLayer::new().max_age(Duration::from_secs(config.max_age_secs));

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return cors
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    // Wildcards are not allowed together with credentials.
    cors.allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.allow_credentials)
}
