//! # Catalog API Library
//!
//! A read-only bookstore catalog served over HTTP: two versioned routes over a fixed set of
//! products, health endpoints, and generated OpenAPI documentation.
//!
//! ## Module Overview
//! - `core`: error types, problem details and layered configuration
//! - `catalog`: the product store and its HTTP handlers
//! - `routing`: route metadata, API version selection and content negotiation
//! - `openapi`: per-version documents and the documentation page
//! - `middleware`: the response pipeline every request passes through
//! - `observability`: structured logging and health checks
//! - `server`: application state, router assembly and the listener

/// Core functionality including error types and configuration
pub mod core;

/// Product store, catalog handlers and their declared metadata
pub mod catalog;

/// Route descriptors, API versioning and content negotiation
pub mod routing;

/// OpenAPI document generation and the documentation UI
pub mod openapi;

/// Response pipeline: problem details, forwarded headers, caching, compression, CORS, logging
pub mod middleware;

/// Structured logging and health checks
pub mod observability;

/// Application state and HTTP server
pub mod server;

// Re-export commonly used types for convenience
pub use crate::catalog::{CatalogStore, Product};
pub use crate::core::config::{AppConfig, ConfigSources, HostEnvironment};
pub use crate::core::error::{CatalogError, CatalogResult, ProblemDetails};
pub use crate::server::{build_router, AppState, CatalogServer};
