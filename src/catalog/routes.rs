//! Declared metadata of the catalog operations

use crate::routing::descriptor::{
    ControllerDescriptor, ParameterDescriptor, ResponseDescriptor, RouteDescriptor,
};
use crate::routing::negotiation::MediaType;
use crate::routing::versioning::ApiVersion;
use axum::http::Method;

pub const PRODUCTS_PATH: &str = "/api/catalog";
pub const PRODUCT_PATH: &str = "/api/catalog/:bookId";

/// Version every catalog route belongs to
pub const CATALOG_VERSION: ApiVersion = ApiVersion::new(1, 0);

pub fn controller() -> ControllerDescriptor {
    ControllerDescriptor::new("Catalog").with_response(
        500,
        ResponseDescriptor::new("Server Error").with_schema("ProblemDetails"),
    )
}

fn produces() -> Vec<&'static str> {
    MediaType::OUTPUT.iter().map(|m| m.as_str()).collect()
}

/// Route metadata for the catalog, controller defaults already merged
pub fn route_descriptors() -> Vec<RouteDescriptor> {
    let controller = controller();

    let list = RouteDescriptor::new("CatalogGetProducts", Method::GET, PRODUCTS_PATH, CATALOG_VERSION)
        .with_summary("Returns all the products in the catalog")
        .with_produces(&produces())
        .with_response(
            200,
            ResponseDescriptor::new("Gets all the products").with_array_of("Product"),
        );

    let get = RouteDescriptor::new("CatalogGetProduct", Method::GET, PRODUCT_PATH, CATALOG_VERSION)
        .with_summary("Returns a specific product in the catalog")
        .with_produces(&produces())
        .with_parameter(ParameterDescriptor::path("bookId", "integer", Some("int32")))
        .with_response(
            200,
            ResponseDescriptor::new("Get a specific product with the provided bookId")
                .with_schema("Product"),
        )
        .with_response(
            404,
            ResponseDescriptor::new("Could not find the book with the provided bookId")
                .with_schema("ProblemDetails"),
        );

    vec![controller.apply(list), controller.apply(get)]
}
