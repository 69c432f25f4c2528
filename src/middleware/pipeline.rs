//! # Response Pipeline
//!
//! The fixed chain every request passes through, outermost first:
//!
//! 1. strict transport security (outside Development)
//! 2. problem details translation
//! 3. panic capture
//! 4. forwarded headers
//! 5. compression gate for https
//! 6. response cache
//! 7. compression (gzip, brotli)
//! 8. CORS
//! 9. request logging
//!
//! The order is significant: the cache sits outside compression so it stores encoded bodies
//! keyed by `Accept-Encoding`, and problem translation sits outside panic capture so panics
//! get problem bodies too.

use crate::middleware::{
    compression, cors, forwarded_headers, problem_details, request_logging, response_caching,
    security_headers,
};
use crate::server::state::AppState;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

/// Wrap `router` (including its fallback) in the response pipeline and attach the state
pub fn apply_pipeline(router: Router<AppState>, state: AppState) -> Router {
    let compression = compression::compression_layer(&state.config.compression);
    let cors = cors::cors_layer(&state.config.cors);

    router
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(
                    state.clone(),
                    security_headers::strict_transport_security,
                ))
                .layer(from_fn_with_state(
                    state.clone(),
                    problem_details::problem_details,
                ))
                .layer(CatchPanicLayer::custom(problem_details::panic_response))
                .layer(from_fn_with_state(
                    state.clone(),
                    forwarded_headers::forwarded_headers,
                ))
                .layer(from_fn_with_state(
                    state.clone(),
                    compression::compression_gate,
                ))
                .layer(from_fn_with_state(
                    state.clone(),
                    response_caching::response_caching,
                ))
                .layer(compression)
                .layer(cors)
                .layer(from_fn(request_logging::request_logging)),
        )
        .with_state(state)
}
