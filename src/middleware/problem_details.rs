//! # Problem Details Translation
//!
//! The single place where errors become response bodies. Handlers and extractors return
//! `CatalogError`, which travels up as a bare status with the error in the response extensions;
//! this middleware maps it to a status through [`ProblemDetailsOptions`] and writes an RFC 7807
//! body. Error statuses produced without a body (unmatched routes, 405s) get a generic problem.

use crate::core::config::HostEnvironment;
use crate::core::error::{CatalogError, ErrorKind, PendingError, ProblemDetails};
use crate::server::state::AppState;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::any::Any;
use tracing::{debug, error, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// What to do with an error of a given kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemMapping {
    Status(StatusCode),
    /// Leave the error untranslated for the host
    Rethrow,
}

/// Error-kind to status mapping table, checked in order
#[derive(Debug, Clone)]
pub struct ProblemDetailsOptions {
    pub include_exception_details: bool,
    mappings: Vec<(ErrorKind, ProblemMapping)>,
}

impl ProblemDetailsOptions {
    pub fn new(environment: HostEnvironment) -> Self {
        Self {
            include_exception_details: environment.is_development(),
            mappings: Vec::new(),
        }
        .rethrow(ErrorKind::Unsupported)
        .map_to_status(ErrorKind::NotImplemented, StatusCode::NOT_IMPLEMENTED)
        .map_to_status(ErrorKind::DependencyUnavailable, StatusCode::SERVICE_UNAVAILABLE)
        .map_to_status(ErrorKind::NotFound, StatusCode::NOT_FOUND)
        .map_to_status(ErrorKind::NotAcceptable, StatusCode::NOT_ACCEPTABLE)
        .map_to_status(ErrorKind::BadRequest, StatusCode::BAD_REQUEST)
    }

    pub fn map_to_status(mut self, kind: ErrorKind, status: StatusCode) -> Self {
        self.mappings.push((kind, ProblemMapping::Status(status)));
        self
    }

    pub fn rethrow(mut self, kind: ErrorKind) -> Self {
        self.mappings.push((kind, ProblemMapping::Rethrow));
        self
    }

    /// First matching entry; anything unmapped is a 500
    pub fn resolve(&self, error: &CatalogError) -> ProblemMapping {
        let kind = error.kind();
        self.mappings
            .iter()
            .find(|(mapped, _)| *mapped == kind)
            .map(|(_, mapping)| *mapping)
            .unwrap_or(ProblemMapping::Status(StatusCode::INTERNAL_SERVER_ERROR))
    }
}

pub async fn problem_details(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let instance = request.uri().path().to_string();
    let trace_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = next.run(request).await;
    let options = &state.problem_details;

    if let Some(PendingError(failure)) = response.extensions_mut().remove::<PendingError>() {
        let status = match options.resolve(&failure) {
            ProblemMapping::Rethrow => {
                warn!(
                    error = %failure,
                    error_type = failure.error_type(),
                    path = %instance,
                    "Unsupported operation rethrown to host"
                );
                return response;
            }
            ProblemMapping::Status(status) => status,
        };

        if status.is_server_error() {
            error!(
                error = %failure,
                error_type = failure.error_type(),
                status = status.as_u16(),
                trace_id = %trace_id,
                "Unhandled error"
            );
        } else {
            debug!(error = %failure, status = status.as_u16(), "Request rejected");
        }

        let mut problem = ProblemDetails::new(status)
            .with_detail(failure.to_string())
            .with_instance(instance)
            .with_trace_id(trace_id);
        if options.include_exception_details {
            problem = problem.with_exception(&failure);
        }
        return with_headers_from(problem.into_response(), response.headers());
    }

    let status = response.status();
    if (status.is_client_error() || status.is_server_error())
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        let problem = ProblemDetails::new(status)
            .with_instance(instance)
            .with_trace_id(trace_id);
        return with_headers_from(problem.into_response(), response.headers());
    }

    response
}

/// Carry headers set further in (CORS, version reporting, `Allow`) onto the problem response
fn with_headers_from(mut problem: Response, original: &HeaderMap) -> Response {
    let skipped: [HeaderName; 2] = [header::CONTENT_TYPE, header::CONTENT_LENGTH];
    for (name, value) in original {
        if !skipped.contains(name) && !problem.headers().contains_key(name) {
            problem.headers_mut().insert(name.clone(), value.clone());
        }
    }
    problem
}

/// Panic handler for `CatchPanicLayer`; the panic becomes an internal error
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    CatalogError::internal(format!("Request handler panicked: {}", message)).into_response()
}
