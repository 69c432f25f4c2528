//! Response compression.
//!
//! gzip and brotli only. Over https compression is off unless `enable_for_https` is set, since
//! compressed secrets over TLS are open to BREACH-style attacks.

use crate::core::config::CompressionSettings;
use crate::middleware::forwarded_headers::ClientInfo;
use crate::server::state::AppState;
use axum::extract::{Request, State};
use axum::http::{header, Extensions, HeaderMap, StatusCode, Version};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tower_http::compression::predicate::{DefaultPredicate, Predicate};
use tower_http::compression::{CompressionLayer, CompressionLevel};
use tracing::trace;

/// Media types compressed without any configuration
pub const DEFAULT_MIME_TYPES: &[&str] = &[
    "text/plain",
    "text/css",
    "application/javascript",
    "text/javascript",
    "text/html",
    "application/xml",
    "text/xml",
    "application/json",
    "text/json",
    "application/wasm",
];

/// Strips `Accept-Encoding` for https clients unless compression over https is allowed
pub async fn compression_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let https = request
        .extensions()
        .get::<ClientInfo>()
        .map(ClientInfo::is_https)
        .unwrap_or(false);

    if https && !state.config.compression.enable_for_https {
        trace!("Compression disabled for https request");
        request.headers_mut().remove(header::ACCEPT_ENCODING);
    }
    next.run(request).await
}

/// Effective allow-list: defaults plus configured extras
pub fn mime_types(settings: &CompressionSettings) -> Vec<String> {
    let mut types: Vec<String> = DEFAULT_MIME_TYPES.iter().map(|m| m.to_string()).collect();
    for extra in &settings.mime_types {
        let extra = extra.trim().to_ascii_lowercase();
        if !types.contains(&extra) {
            types.push(extra);
        }
    }
    types
}

pub fn compression_layer(settings: &CompressionSettings) -> CompressionLayer<impl Predicate> {
    let enabled = settings.enabled;
    let allowed: Arc<[String]> = mime_types(settings).into();

    let allow_list = move |_: StatusCode, _: Version, headers: &HeaderMap, _: &Extensions| -> bool {
        if !enabled {
            return false;
        }
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|essence| {
                let essence = essence.trim().to_ascii_lowercase();
                allowed.iter().any(|allowed| *allowed == essence)
            })
            .unwrap_or(false)
    };

    CompressionLayer::new()
        .no_deflate()
        .no_zstd()
        .quality(CompressionLevel::Default)
        .compress_when(DefaultPredicate::new().and(allow_list))
}
