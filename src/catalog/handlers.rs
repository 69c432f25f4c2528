//! HTTP handlers for the catalog resource

use crate::core::error::{CatalogError, ProblemDetails};
use crate::routing::negotiation::{Negotiated, NegotiatedJson};
use crate::routing::versioning::RequestedApiVersion;
use crate::server::state::AppState;
use axum::extract::{FromRequestParts, OriginalUri, Path, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, info};

/// The `{bookId}` segment under the integer route constraint. A non-integer id means the route
/// did not match, so this must be extracted before anything that could reject the request for
/// another reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookId(pub i32);

#[axum::async_trait]
impl<S> FromRequestParts<S> for BookId
where
    S: Send + Sync,
{
    type Rejection = CatalogError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let not_matched = |parts: &Parts| CatalogError::RouteNotMatched {
            path: parts
                .extensions
                .get::<OriginalUri>()
                .map(|OriginalUri(uri)| uri.path().to_string())
                .unwrap_or_else(|| parts.uri.path().to_string()),
        };

        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| not_matched(parts))?;
        raw.parse().map(BookId).map_err(|_| not_matched(parts))
    }
}

/// `GET /api/catalog`
pub async fn get_products(
    State(state): State<AppState>,
    RequestedApiVersion(version): RequestedApiVersion,
    Negotiated(media_type): Negotiated,
) -> Response {
    info!(
        operation = "CatalogGetProducts",
        api_version = %version,
        count = state.store.len(),
        "Listing catalog products"
    );

    let response = NegotiatedJson {
        media_type,
        indented: state.config.json.is_indented(state.config.environment),
        body: state.store.list_all(),
    }
    .into_response();
    with_cache_control(&state, response)
}

/// `GET /api/catalog/{bookId}`
pub async fn get_product(
    State(state): State<AppState>,
    BookId(id): BookId,
    OriginalUri(uri): OriginalUri,
    RequestedApiVersion(version): RequestedApiVersion,
    Negotiated(media_type): Negotiated,
) -> Result<Response, CatalogError> {
    let Some(product) = state.store.get_by_id(id) else {
        debug!(book_id = id, "Product not found");
        let problem = ProblemDetails::new(StatusCode::NOT_FOUND)
            .with_detail(CatalogError::ProductNotFound { id }.to_string())
            .with_instance(uri.path());
        return Ok(problem.into_response());
    };

    info!(
        operation = "CatalogGetProduct",
        api_version = %version,
        book_id = id,
        "Fetched catalog product"
    );

    let response = NegotiatedJson {
        media_type,
        indented: state.config.json.is_indented(state.config.environment),
        body: product,
    }
    .into_response();
    Ok(with_cache_control(&state, response))
}

fn with_cache_control(state: &AppState, mut response: Response) -> Response {
    let max_age = state.config.response_caching.catalog_max_age;
    if max_age > 0 && response.status().is_success() {
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", max_age)) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
    }
    response
}
