//! # Response Pipeline Integration Tests
//!
//! Exercises the middleware chain end to end: problem translation, panics, forwarded headers,
//! compression, caching, CORS and HSTS.

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use catalog_api::middleware::apply_pipeline;
use catalog_api::{build_router, AppConfig, AppState, CatalogError, HostEnvironment};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;
use std::net::SocketAddr;
use tower::ServiceExt;

fn app(config: AppConfig) -> Router {
    build_router(AppState::new(config).unwrap())
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Routes that fail in every way the pipeline knows how to translate
fn failing_app(config: AppConfig) -> Router {
    let state = AppState::new(config).unwrap();
    let routes = Router::new()
        .route(
            "/not-implemented",
            get(|| async { Err::<(), _>(CatalogError::not_implemented("bulk import")) }),
        )
        .route(
            "/unavailable",
            get(|| async {
                Err::<(), _>(CatalogError::dependency_unavailable("inventory", "connection refused"))
            }),
        )
        .route(
            "/unsupported",
            get(|| async { Err::<(), _>(CatalogError::unsupported("rename")) }),
        )
        .route(
            "/internal",
            get(|| async { Err::<(), _>(CatalogError::internal("disk on fire")) }),
        )
        .route("/panic", get(panicking_handler));
    apply_pipeline(routes, state)
}

async fn panicking_handler() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let response = send(
        app(AppConfig::default()),
        Request::builder()
            .uri("/api/catalog")
            .header(header::ORIGIN, "https://shop.example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
    let exposed = response
        .headers()
        .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(exposed.contains("api-supported-versions"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let response = send(
        app(AppConfig::default()),
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/catalog")
            .header(header::ORIGIN, "https://shop.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_hsts_outside_development() {
    let response = send(app(AppConfig::default()), get_request("/api/catalog")).await;
    let hsts = response
        .headers()
        .get(header::STRICT_TRANSPORT_SECURITY)
        .unwrap();
    assert!(hsts.to_str().unwrap().starts_with("max-age=31536000"));
    assert!(response.headers().get(header::SERVER).is_none());

    let mut config = AppConfig::default();
    config.environment = HostEnvironment::Development;
    let response = send(app(config), get_request("/api/catalog")).await;
    assert!(response
        .headers()
        .get(header::STRICT_TRANSPORT_SECURITY)
        .is_none());
}

#[tokio::test]
async fn test_gzip_compression() {
    let response = send(
        app(AppConfig::default()),
        Request::builder()
            .uri("/api/catalog")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );

    let compressed = body_bytes(response).await;
    let mut decoded = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut decoded)
        .unwrap();
    let products: Value = serde_json::from_str(&decoded).unwrap();
    assert_eq!(products.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_brotli_compression() {
    let response = send(
        app(AppConfig::default()),
        Request::builder()
            .uri("/api/catalog/2")
            .header(header::ACCEPT_ENCODING, "gzip;q=0.5, br")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "br"
    );

    let compressed = body_bytes(response).await;
    let mut decoded = String::new();
    brotli::Decompressor::new(compressed.as_slice(), 4096)
        .read_to_string(&mut decoded)
        .unwrap();
    let product: Value = serde_json::from_str(&decoded).unwrap();
    assert_eq!(product["id"], 2);
    assert_eq!(product["name"], "Wife Of The North");
}

#[tokio::test]
async fn test_compression_can_be_disabled() {
    let mut config = AppConfig::default();
    config.compression.enabled = false;

    let response = send(
        app(config),
        Request::builder()
            .uri("/api/catalog")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
}

fn proxied_request(proto: &str) -> Request<Body> {
    let proxy: SocketAddr = "10.0.0.1:40000".parse().unwrap();
    let mut request = Request::builder()
        .uri("/api/catalog")
        .header(header::ACCEPT_ENCODING, "gzip")
        .header("x-forwarded-for", "203.0.113.7")
        .header("x-forwarded-proto", proto)
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(proxy));
    request
}

fn trusting_proxy() -> AppConfig {
    let mut config = AppConfig::default();
    config.forwarded_headers.known_proxies = vec!["10.0.0.1".parse().unwrap()];
    config
}

#[tokio::test]
async fn test_no_compression_over_https_from_trusted_proxy() {
    let response = send(app(trusting_proxy()), proxied_request("https")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());

    let response = send(app(trusting_proxy()), proxied_request("http")).await;
    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );
}

#[tokio::test]
async fn test_https_compression_when_enabled() {
    let mut config = trusting_proxy();
    config.compression.enable_for_https = true;

    let response = send(app(config), proxied_request("https")).await;
    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );
}

#[tokio::test]
async fn test_untrusted_proxy_headers_are_ignored() {
    // The peer is not a known proxy, so the https claim is not believed
    let response = send(app(AppConfig::default()), proxied_request("https")).await;
    assert_eq!(
        response.headers().get(header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );
}

#[tokio::test]
async fn test_error_kinds_map_to_statuses() {
    for (path, status) in [
        ("/not-implemented", StatusCode::NOT_IMPLEMENTED),
        ("/unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("/internal", StatusCode::INTERNAL_SERVER_ERROR),
    ] {
        let response = send(failing_app(AppConfig::default()), get_request(path)).await;
        assert_eq!(response.status(), status, "{}", path);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );

        let problem = json_body(response).await;
        assert_eq!(problem["status"], status.as_u16());
        assert_eq!(problem["instance"], path);
        assert!(problem["traceId"].is_string());
        assert!(problem.get("exceptionDetails").is_none());
    }
}

#[tokio::test]
async fn test_panic_becomes_problem() {
    let response = send(failing_app(AppConfig::default()), get_request("/panic")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let problem = json_body(response).await;
    assert_eq!(problem["status"], 500);
    assert_eq!(problem["title"], "Internal Server Error");
}

#[tokio::test]
async fn test_unsupported_is_not_translated() {
    let response = send(failing_app(AppConfig::default()), get_request("/unsupported")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_exception_details_in_development() {
    let mut config = AppConfig::default();
    config.environment = HostEnvironment::Development;

    let response = send(failing_app(config), get_request("/internal")).await;
    let problem = json_body(response).await;

    let details = problem["exceptionDetails"].as_array().unwrap();
    assert_eq!(details[0]["type"], "internal_error");
    assert!(details[0]["message"]
        .as_str()
        .unwrap()
        .contains("disk on fire"));
}

#[tokio::test]
async fn test_method_not_allowed_gets_problem_body() {
    let response = send(
        app(AppConfig::default()),
        Request::builder()
            .method(Method::DELETE)
            .uri("/api/catalog/1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.headers().get(header::ALLOW).is_some());
    let problem = json_body(response).await;
    assert_eq!(problem["status"], 405);
}

#[tokio::test]
async fn test_cacheable_responses_are_served_from_cache() {
    let mut config = AppConfig::default();
    config.response_caching.catalog_max_age = 60;
    let state = AppState::new(config).unwrap();
    let app = build_router(state.clone());

    let first = send(app.clone(), get_request("/api/catalog")).await;
    assert_eq!(
        first.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=60"
    );
    assert!(first.headers().get(header::AGE).is_none());
    let first_body = body_bytes(first).await;
    assert_eq!(state.cache.len(), 1);

    let second = send(app.clone(), get_request("/api/catalog")).await;
    assert!(second.headers().get(header::AGE).is_some());
    assert_eq!(body_bytes(second).await, first_body);

    // Clients asking for fresh content skip the cache
    let fresh = send(
        app,
        Request::builder()
            .uri("/api/catalog")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(fresh.headers().get(header::AGE).is_none());
}

#[tokio::test]
async fn test_responses_without_max_age_are_not_cached() {
    let state = AppState::new(AppConfig::default()).unwrap();
    let app = build_router(state.clone());

    send(app.clone(), get_request("/api/catalog")).await;
    let second = send(app, get_request("/api/catalog")).await;

    assert!(second.headers().get(header::AGE).is_none());
    assert!(state.cache.is_empty());
}
