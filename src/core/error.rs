//! # Error Handling Module
//!
//! This module defines every failure the catalog service can produce, using the `thiserror`
//! crate, together with the RFC 7807 problem-details body that clients receive.
//!
//! Handlers never write error bodies themselves. Returning `Err(CatalogError)` yields a bare
//! status response that carries the error in its extensions; the problem-details middleware
//! (see `middleware::problem_details`) is the single place where errors become bodies. The one
//! exception is the catalog's own "product not found", which the resource handler answers
//! directly with a [`ProblemDetails`] body.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;

/// Main result type used throughout the service
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Media type of every error body written by the service.
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Comprehensive error types for the catalog service
#[derive(Debug, Error, Clone)]
pub enum CatalogError {
    /// No product exists with the requested id
    #[error("Product {id} was not found")]
    ProductNotFound { id: i32 },

    /// No route matched the request path (including ids that are not integers)
    #[error("No route matches {path}")]
    RouteNotMatched { path: String },

    /// None of the media types in the Accept header can be produced
    #[error("None of the requested media types are supported: {accept}")]
    NotAcceptable { accept: String },

    /// The `api-version` query parameter could not be parsed
    #[error("Invalid API version '{value}'")]
    InvalidApiVersion { value: String },

    /// The requested API version is well formed but not served
    #[error("API version {requested} is not supported; supported versions: {supported}")]
    UnsupportedApiVersion { requested: String, supported: String },

    /// A capability is declared but has no implementation yet
    #[error("Not implemented: {feature}")]
    NotImplemented { feature: String },

    /// A downstream dependency could not be reached
    #[error("Dependency unavailable: {dependency} - {reason}")]
    DependencyUnavailable { dependency: String, reason: String },

    /// The operation is not supported; this is rethrown to the host, never translated
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    /// Configuration-related errors (invalid files, bad overrides, failed validation)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Internal server errors for unexpected failures (including captured panics)
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

/// Coarse classification used by the status-code translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    NotAcceptable,
    BadRequest,
    NotImplemented,
    DependencyUnavailable,
    Unsupported,
    Other,
}

impl CatalogError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a not-implemented error for the named capability
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Create a dependency-unavailable error
    pub fn dependency_unavailable<S: Into<String>>(dependency: S, reason: S) -> Self {
        Self::DependencyUnavailable {
            dependency: dependency.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported<S: Into<String>>(operation: S) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProductNotFound { .. } | Self::RouteNotMatched { .. } => ErrorKind::NotFound,
            Self::NotAcceptable { .. } => ErrorKind::NotAcceptable,
            Self::InvalidApiVersion { .. } | Self::UnsupportedApiVersion { .. } => {
                ErrorKind::BadRequest
            }
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Configuration { .. }
            | Self::Internal { .. }
            | Self::Io { .. }
            | Self::Json { .. }
            | Self::Yaml { .. } => ErrorKind::Other,
        }
    }

    /// Get the HTTP status code this error carries before translation.
    ///
    /// The problem-details middleware may override it through its mapping table.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ErrorKind::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Unsupported | ErrorKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a string representation of the error type for problem bodies and logs
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::ProductNotFound { .. } => "product_not_found",
            Self::RouteNotMatched { .. } => "route_not_matched",
            Self::NotAcceptable { .. } => "not_acceptable",
            Self::InvalidApiVersion { .. } => "invalid_api_version",
            Self::UnsupportedApiVersion { .. } => "unsupported_api_version",
            Self::NotImplemented { .. } => "not_implemented",
            Self::DependencyUnavailable { .. } => "dependency_unavailable",
            Self::Unsupported { .. } => "unsupported_operation",
            Self::Configuration { .. } => "configuration_error",
            Self::Internal { .. } => "internal_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Yaml { .. } => "yaml_error",
        }
    }
}

impl From<Infallible> for CatalogError {
    fn from(infallible: Infallible) -> Self {
        match infallible {}
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

/// Untranslated error riding in the response extensions until the problem-details
/// middleware picks it up.
#[derive(Debug, Clone)]
pub struct PendingError(pub Arc<CatalogError>);

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let mut response = self.status_code().into_response();
        response
            .extensions_mut()
            .insert(PendingError(Arc::new(self)));
        response
    }
}

/// RFC 7807 problem details body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Only populated outside production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_details: Option<Vec<ExceptionDetail>>,
}

/// One link of an error's source chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExceptionDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub raw: String,
}

impl ProblemDetails {
    pub fn new(status: StatusCode) -> Self {
        Self {
            kind: format!("https://httpstatuses.io/{}", status.as_u16()),
            title: status
                .canonical_reason()
                .unwrap_or("Unknown Status")
                .to_string(),
            status: status.as_u16(),
            detail: None,
            instance: None,
            trace_id: None,
            exception_details: None,
        }
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance<S: Into<String>>(mut self, instance: S) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_trace_id<S: Into<String>>(mut self, trace_id: S) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Attach the error and its source chain.
    pub fn with_exception(mut self, error: &CatalogError) -> Self {
        let mut details = vec![ExceptionDetail {
            kind: error.error_type().to_string(),
            message: error.to_string(),
            raw: format!("{:?}", error),
        }];
        let mut source = std::error::Error::source(error);
        while let Some(inner) = source {
            details.push(ExceptionDetail {
                kind: "source".to_string(),
                message: inner.to_string(),
                raw: format!("{:?}", inner),
            });
            source = inner.source();
        }
        self.exception_details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match serde_json::to_vec(&self) {
            Ok(body) => (
                status,
                [(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON))],
                body,
            )
                .into_response(),
            Err(_) => status.into_response(),
        }
    }
}
