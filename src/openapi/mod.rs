//! # OpenAPI Documentation
//!
//! Generates one OpenAPI document per declared API version from the route descriptors, and
//! serves them together with the interactive documentation page.
//!
//! ## Key Features
//! - Deterministic output: same routes in, same bytes out
//! - Operation filters for the version parameter and synthesized 401/403 responses
//! - Documents generated once at startup and handed to `SwaggerUi`
//!
//! ## Rust Concepts Used
//! - Trait objects (`Box<dyn OperationFilter>`) for the filter chain
//! - `utoipa` builders for the document model and `ToSchema` derives for the components

pub mod document;
pub mod filters;
pub mod ui;

pub use filters::{OperationContext, OperationFilter};

use crate::routing::descriptor::RouteDescriptor;
use crate::routing::versioning::{ApiVersionDescriptor, ApiVersionRegistry};
use crate::server::state::AppState;
use axum::Router;
use std::collections::BTreeMap;
use tracing::{info, warn};
use utoipa::openapi::path::PathItemBuilder;
use utoipa::openapi::{InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder};

const TITLE: &str = env!("CARGO_PKG_NAME");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Builds OpenAPI documents from route metadata
pub struct DocumentGenerator {
    routes: Vec<RouteDescriptor>,
    filters: Vec<Box<dyn OperationFilter>>,
}

impl DocumentGenerator {
    /// Generator with the default operation filters
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self {
            routes,
            filters: filters::default_filters(),
        }
    }

    pub fn with_filter(mut self, filter: Box<dyn OperationFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Document for a single version group
    pub fn generate(&self, group: &ApiVersionDescriptor, versions: &ApiVersionRegistry) -> OpenApi {
        let description = if group.deprecated {
            format!("{} This API version has been deprecated.", DESCRIPTION)
        } else {
            DESCRIPTION.to_string()
        };

        let mut items: BTreeMap<String, PathItemBuilder> = BTreeMap::new();
        for route in self
            .routes
            .iter()
            .filter(|route| route.api_version == group.version)
        {
            let Some(method) = document::path_item_type(&route.method) else {
                warn!(method = %route.method, path = %route.path, "Route method cannot be documented");
                continue;
            };

            let mut operation = document::build_operation(route);
            let context = OperationContext {
                route,
                group,
                versions,
            };
            for filter in &self.filters {
                filter.apply(&mut operation, &context);
            }

            let item = items.remove(&route.openapi_path()).unwrap_or_default();
            items.insert(route.openapi_path(), item.operation(method, operation));
        }

        let paths = items
            .into_iter()
            .fold(PathsBuilder::new(), |paths, (path, item)| {
                paths.path(path, item.build())
            });

        OpenApiBuilder::new()
            .info(
                InfoBuilder::new()
                    .title(TITLE)
                    .version(group.version.to_string())
                    .description(Some(description)),
            )
            .paths(paths)
            .components(Some(document::components()))
            .build()
    }

    /// Documents for every group, newest version first
    pub fn generate_all(&self, versions: &ApiVersionRegistry) -> Vec<(ApiVersionDescriptor, OpenApi)> {
        versions
            .descriptions()
            .iter()
            .map(|group| (group.clone(), self.generate(group, versions)))
            .collect()
    }
}

/// Every version's document, generated once at startup
#[derive(Clone)]
pub struct ApiDocumentation {
    documents: Vec<(ApiVersionDescriptor, OpenApi)>,
}

impl ApiDocumentation {
    pub fn build(generator: &DocumentGenerator, versions: &ApiVersionRegistry) -> Self {
        let documents = generator.generate_all(versions);
        info!(documents = documents.len(), "OpenAPI documents generated");
        Self { documents }
    }

    /// Newest version first
    pub fn documents(&self) -> &[(ApiVersionDescriptor, OpenApi)] {
        &self.documents
    }

    pub fn document(&self, group_name: &str) -> Option<&OpenApi> {
        self.documents
            .iter()
            .find(|(group, _)| group.group_name == group_name)
            .map(|(_, document)| document)
    }
}

/// Documentation page at `/` and `GET /swagger/{group}/swagger.json` for each version
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().merge(ui::swagger_ui(state.documents.documents()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::routes::route_descriptors;
    use crate::core::config::ApiVersioningSettings;
    use document::{has_parameter, has_response};
    use utoipa::openapi::path::{ParameterIn, PathItemType};

    fn setup() -> (DocumentGenerator, ApiVersionRegistry) {
        let routes = route_descriptors();
        let versions =
            ApiVersionRegistry::from_routes(&routes, &ApiVersioningSettings::default()).unwrap();
        (DocumentGenerator::new(routes), versions)
    }

    #[test]
    fn test_catalog_document() {
        let (generator, versions) = setup();
        let document = generator.generate(&versions.descriptions()[0], &versions);

        assert_eq!(document.info.version, "1.0");
        let get = &document.paths.paths["/api/catalog/{bookId}"].operations[&PathItemType::Get];
        assert_eq!(get.operation_id.as_deref(), Some("CatalogGetProduct"));
        let statuses: Vec<&str> = get.responses.responses.keys().map(String::as_str).collect();
        assert_eq!(statuses, vec!["200", "404", "500"]);
        assert!(has_parameter(get, "bookId", ParameterIn::Path));
        assert!(has_parameter(get, "api-version", ParameterIn::Query));
        assert!(!has_response(get, 401));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let (generator, versions) = setup();
        let first = serde_json::to_vec(&generator.generate_all(&versions)[0].1).unwrap();
        let second = serde_json::to_vec(&generator.generate_all(&versions)[0].1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_documentation_finds_known_groups() {
        let (generator, versions) = setup();
        let documentation = ApiDocumentation::build(&generator, &versions);
        assert!(documentation.document("v1").is_some());
        assert!(documentation.document("v9").is_none());
    }
}
