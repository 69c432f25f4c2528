//! Route matching ignores case and trailing slashes.
//!
//! The router itself matches exactly, so the request path is rewritten before it reaches the
//! router: trailing slashes trimmed, ASCII letters lowercased. The query string is untouched.

use axum::extract::Request;
use axum::http::uri::{PathAndQuery, Uri};
use axum::middleware::map_request;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::debug;

/// Serve `router` behind path normalization. The outer router only forwards, so the rewrite
/// happens before any route is matched.
pub fn normalize_paths(router: Router) -> Router {
    let normalized = ServiceBuilder::new()
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(map_request(lowercase_path))
        .service(router);

    Router::new().fallback_service(normalized)
}

pub async fn lowercase_path(mut request: Request) -> Request {
    if let Some(uri) = lowercased(request.uri()) {
        debug!(from = %request.uri().path(), to = %uri.path(), "Request path lowercased");
        *request.uri_mut() = uri;
    }
    request
}

/// `None` when the path is already lowercase or the rewrite would not form a valid URI
fn lowercased(uri: &Uri) -> Option<Uri> {
    let path = uri.path();
    if !path.bytes().any(|byte| byte.is_ascii_uppercase()) {
        return None;
    }

    let lowered = match uri.query() {
        Some(query) => format!("{}?{}", path.to_ascii_lowercase(), query),
        None => path.to_ascii_lowercase(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(lowered).ok()?);
    Uri::from_parts(parts).ok()
}
