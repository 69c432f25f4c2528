//! # Catalog Resource
//!
//! The read-only book catalog: the fixed product store, its two HTTP operations, and the
//! route metadata the documentation generator reads.

pub mod handlers;
pub mod routes;
pub mod store;

pub use store::{CatalogStore, Product};

use crate::routing::versioning::report_api_versions;
use crate::server::state::AppState;
use axum::middleware::map_response_with_state;
use axum::routing::get;
use axum::Router;

/// Catalog routes; versioned, so every response reports the served API versions
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(routes::PRODUCTS_PATH, get(handlers::get_products))
        .route(routes::PRODUCT_PATH, get(handlers::get_product))
        .route_layer(map_response_with_state(state, report_api_versions))
}
