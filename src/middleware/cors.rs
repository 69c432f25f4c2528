use crate::core::config::CorsSettings;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|value| value == "*")
}

/// Build the named CORS policy; "*" in a list means any value
pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let mut cors = CorsLayer::new();

    // Configure allowed origins
    if is_wildcard(&settings.allowed_origins) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = settings
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        cors = cors.allow_origin(AllowOrigin::list(origins));
    }

    // Configure allowed methods
    if is_wildcard(&settings.allowed_methods) {
        cors = cors.allow_methods(AllowMethods::any());
    } else {
        let methods: Vec<Method> = settings
            .allowed_methods
            .iter()
            .filter_map(|method| method.parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure allowed headers
    if is_wildcard(&settings.allowed_headers) {
        cors = cors.allow_headers(AllowHeaders::any());
    } else {
        let headers: Vec<HeaderName> = settings
            .allowed_headers
            .iter()
            .filter_map(|header| header.parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    let exposed: Vec<HeaderName> = settings
        .exposed_headers
        .iter()
        .filter_map(|header| header.parse().ok())
        .collect();
    if !exposed.is_empty() {
        cors = cors.expose_headers(exposed);
    }

    info!(policy = %settings.policy_name, "CORS policy configured");
    cors
}
