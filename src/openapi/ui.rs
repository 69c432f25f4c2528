//! Interactive documentation page

use crate::routing::versioning::ApiVersionDescriptor;
use utoipa::openapi::OpenApi;
use utoipa_swagger_ui::{Config, SwaggerUi, Url};

/// Where the page is mounted
pub const UI_PATH: &str = "/";

/// URL of the machine-readable document of a version group
pub fn document_url(group_name: &str) -> String {
    format!("/swagger/{}/swagger.json", group_name)
}

/// Selector entries, in the order of `documents` (newest first)
pub fn endpoints(documents: &[(ApiVersionDescriptor, OpenApi)]) -> Vec<Url<'static>> {
    documents
        .iter()
        .map(|(group, _)| {
            Url::new(
                leak(format!("Version {}", group.version)),
                leak(document_url(&group.group_name)),
            )
        })
        .collect()
}

/// Page listing every document, with operation ids and request durations shown
pub fn swagger_ui(documents: &[(ApiVersionDescriptor, OpenApi)]) -> SwaggerUi {
    let urls = endpoints(documents);
    let config = Config::new(urls.clone())
        .display_operation_id(true)
        .display_request_duration(true);

    urls.into_iter()
        .zip(documents)
        .fold(SwaggerUi::new(UI_PATH).config(config), |ui, (url, (_, document))| {
            ui.url(url, document.clone())
        })
}

// `Url` only borrows; the router lives for the whole process and holds one entry per version.
fn leak(text: String) -> &'static str {
    Box::leak(text.into_boxed_str())
}
