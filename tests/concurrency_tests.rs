//! # Concurrent Request Tests
//!
//! The catalog is shared read-only state; many simultaneous readers must all see the same data.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use catalog_api::{build_router, AppConfig, AppState};
use futures::future::join_all;
use tower::ServiceExt;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_are_consistent() {
    let app = build_router(AppState::new(AppConfig::default()).unwrap());

    let requests = (0..64).map(|i| {
        let app = app.clone();
        let uri = if i % 2 == 0 {
            "/api/catalog".to_string()
        } else {
            format!("/api/catalog/{}", i % 5 + 1)
        };
        tokio::spawn(async move {
            let response = app
                .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (uri, status, body)
        })
    });

    let results = join_all(requests).await;
    let mut list_body = None;
    for result in results {
        let (uri, status, body) = result.unwrap();
        assert_eq!(status, StatusCode::OK, "{}", uri);
        if uri == "/api/catalog" {
            match &list_body {
                None => list_body = Some(body),
                Some(expected) => assert_eq!(&body, expected),
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cached_reads() {
    let mut config = AppConfig::default();
    config.response_caching.catalog_max_age = 30;
    let state = AppState::new(config).unwrap();
    let app = build_router(state.clone());

    let requests = (0..32).map(|_| {
        let app = app.clone();
        async move {
            app.oneshot(Request::builder().uri("/api/catalog/2").body(Body::empty()).unwrap())
                .await
                .unwrap()
                .status()
        }
    });

    let statuses = join_all(requests).await;
    assert!(statuses.iter().all(|status| *status == StatusCode::OK));
    assert_eq!(state.cache.len(), 1);
}
