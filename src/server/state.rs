//! Shared application state, built explicitly at startup and cloned into every handler.

use crate::catalog::routes::route_descriptors;
use crate::catalog::CatalogStore;
use crate::core::config::AppConfig;
use crate::core::error::CatalogResult;
use crate::middleware::problem_details::ProblemDetailsOptions;
use crate::middleware::response_caching::ResponseCache;
use crate::observability::health::HealthChecker;
use crate::openapi::{ApiDocumentation, DocumentGenerator};
use crate::routing::descriptor::RouteDescriptor;
use crate::routing::versioning::ApiVersionRegistry;
use std::sync::Arc;

/// Everything a request may read; all of it immutable after construction except the cache
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: CatalogStore,
    pub versions: Arc<ApiVersionRegistry>,
    pub documents: Arc<ApiDocumentation>,
    pub health: Arc<HealthChecker>,
    pub cache: Arc<ResponseCache>,
    pub problem_details: Arc<ProblemDetailsOptions>,
}

impl AppState {
    /// State for the seeded catalog with no registered health checks
    pub fn new(config: AppConfig) -> CatalogResult<Self> {
        Self::with_parts(
            config,
            CatalogStore::seeded(),
            route_descriptors(),
            HealthChecker::new(),
        )
    }

    pub fn with_parts(
        config: AppConfig,
        store: CatalogStore,
        routes: Vec<RouteDescriptor>,
        health: HealthChecker,
    ) -> CatalogResult<Self> {
        config.validate()?;

        let versions = ApiVersionRegistry::from_routes(&routes, &config.api_versioning)?;
        let generator = DocumentGenerator::new(routes);
        let documents = ApiDocumentation::build(&generator, &versions);

        Ok(Self {
            cache: Arc::new(ResponseCache::new(&config.response_caching)),
            problem_details: Arc::new(ProblemDetailsOptions::new(config.environment)),
            config: Arc::new(config),
            store,
            versions: Arc::new(versions),
            documents: Arc::new(documents),
            health: Arc::new(health),
        })
    }
}
