//! # Catalog Endpoint Integration Tests
//!
//! Drives the fully assembled router (pipeline included) through `axum-test`.

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use catalog_api::{build_router, AppConfig, AppState, Product};
use serde_json::Value;

fn server() -> TestServer {
    server_with(AppConfig::default())
}

fn server_with(config: AppConfig) -> TestServer {
    let state = AppState::new(config).unwrap();
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn test_list_returns_all_products_in_order() {
    let server = server();

    let response = server.get("/api/catalog").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=utf-8"
    );

    let products: Vec<Product> = response.json();
    let ids: Vec<i32> = products.iter().map(|product| product.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(products[0].name, "Fish Without Hate");
    assert_eq!(products[0].author, "HACHIRO PERALEZ");
}

#[tokio::test]
async fn test_products_use_camel_case_and_numeric_prices() {
    let server = server();

    let response = server.get("/api/catalog/3").await;
    assert!(response.text().contains(r#""price":4.99"#));

    let body: Value = response.json();
    assert_eq!(body["id"], 3);
    assert_eq!(body["name"], "Men Of The East");
    assert!(body["price"].is_number());
    assert_eq!(body["price"].to_string(), "4.99");
    assert!(body.get("description").is_some());

    let products: Value = server.get("/api/catalog").await.json();
    assert_eq!(products[1]["price"].to_string(), "666");
    assert_eq!(products[3]["price"].to_string(), "14.99");
}

#[tokio::test]
async fn test_every_seeded_id_resolves() {
    let server = server();

    for id in 1..=5 {
        let response = server.get(&format!("/api/catalog/{}", id)).await;
        assert_eq!(response.status_code(), StatusCode::OK, "product {}", id);
        let product: Product = response.json();
        assert_eq!(product.id, id);
    }
}

#[tokio::test]
async fn test_unknown_id_returns_problem() {
    let server = server();

    let response = server.get("/api/catalog/999").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );

    let problem: Value = response.json();
    assert_eq!(problem["status"], 404);
    assert_eq!(problem["title"], "Not Found");
    assert_eq!(problem["instance"], "/api/catalog/999");
}

#[tokio::test]
async fn test_non_integer_id_does_not_match_route() {
    let server = server();

    let response = server.get("/api/catalog/abc").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let problem: Value = response.json();
    assert_eq!(problem["status"], 404);
    assert!(problem["detail"].as_str().unwrap().contains("/api/catalog/abc"));
}

#[tokio::test]
async fn test_non_integer_id_wins_over_invalid_version() {
    let server = server();

    let response = server
        .get("/api/catalog/abc")
        .add_query_param("api-version", "banana")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server
        .get("/api/catalog/abc")
        .add_query_param("api-version", "2.0")
        .add_header(header::ACCEPT, HeaderValue::from_static("image/png"))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_paths_match_regardless_of_case() {
    let server = server();

    for path in ["/API/Catalog", "/Api/Catalog/3", "/api/CATALOG/3"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::OK, "path {}", path);
    }

    let product: Product = server.get("/Api/Catalog/3").await.json();
    assert_eq!(product.id, 3);
}

#[tokio::test]
async fn test_trailing_slash_is_ignored() {
    let server = server();

    let response = server.get("/api/catalog/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let products: Vec<Product> = response.json();
    assert_eq!(products.len(), 5);

    assert_eq!(server.get("/api/catalog/2/").await.status_code(), StatusCode::OK);
    assert_eq!(server.get("/API/Catalog/4/").await.status_code(), StatusCode::OK);
    assert_eq!(
        server.get("/api/health/live/").await.status_code(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_unknown_path_returns_problem() {
    let server = server();

    let response = server.get("/api/books").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
}

#[tokio::test]
async fn test_api_version_parameter() {
    let server = server();

    for version in ["1.0", "1"] {
        let response = server
            .get("/api/catalog")
            .add_query_param("api-version", version)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "version {}", version);
    }

    let response = server
        .get("/api/catalog")
        .add_query_param("api-version", "2.0")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let problem: Value = response.json();
    assert!(problem["detail"].as_str().unwrap().contains("2.0"));

    let response = server
        .get("/api/catalog/1")
        .add_query_param("api-version", "banana")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_supported_versions_are_reported() {
    let server = server();

    let response = server.get("/api/catalog").await;
    assert_eq!(
        response.headers().get("api-supported-versions").unwrap(),
        "1.0"
    );
    assert!(response.headers().get("api-deprecated-versions").is_none());

    // Also on rejected requests
    let response = server
        .get("/api/catalog")
        .add_query_param("api-version", "3.0")
        .await;
    assert_eq!(
        response.headers().get("api-supported-versions").unwrap(),
        "1.0"
    );
}

#[tokio::test]
async fn test_version_reporting_can_be_disabled() {
    let mut config = AppConfig::default();
    config.api_versioning.report_api_versions = false;
    let server = server_with(config);

    let response = server.get("/api/catalog").await;
    assert!(response.headers().get("api-supported-versions").is_none());
}

#[tokio::test]
async fn test_content_negotiation() {
    let server = server();

    let response = server
        .get("/api/catalog")
        .add_header(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.restful+json"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.restful+json; charset=utf-8"
    );

    let response = server
        .get("/api/catalog")
        .add_header(header::ACCEPT, HeaderValue::from_static("text/plain"))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_ACCEPTABLE);
    let problem: Value = response.json();
    assert_eq!(problem["status"], 406);
}

#[tokio::test]
async fn test_development_json_is_indented() {
    let mut config = AppConfig::default();
    config.environment = catalog_api::HostEnvironment::Development;
    let server = server_with(config);

    let text = server.get("/api/catalog/1").await.text();
    assert!(text.contains("\n  \"id\": 1"));

    let compact = server_with(AppConfig::default())
        .get("/api/catalog/1")
        .await
        .text();
    assert!(!compact.contains('\n'));
}

#[tokio::test]
async fn test_reads_are_idempotent() {
    let server = server();

    let first = server.get("/api/catalog").await.text();
    for _ in 0..5 {
        assert_eq!(server.get("/api/catalog").await.text(), first);
    }
}

#[tokio::test]
async fn test_request_id_becomes_trace_id() {
    let server = server();

    let response = server
        .get("/api/catalog/oops")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-42"),
        )
        .await;
    let problem: Value = response.json();
    assert_eq!(problem["traceId"], "req-42");
}
