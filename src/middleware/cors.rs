use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::config;

/// Builds the CORS layer from the configured frontend origins. Outside
/// of production an empty origin list falls back to allowing any
/// origin, which keeps local frontends working without configuration.
pub fn layer(config: &config::Server) -> CorsLayer {
    let origins = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(..) => {
                warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE];

    if origins.is_empty() && !config.environment.is_production() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
}
