//! Translation of route metadata into `utoipa` OpenAPI types, plus lookups used by the
//! operation filters.

use crate::catalog::Product;
use crate::core::error::{ExceptionDetail, ProblemDetails};
use crate::routing::descriptor::{
    ParameterDescriptor, ParameterLocation, ResponseDescriptor, RouteDescriptor,
};
use axum::http::Method;
use utoipa::openapi::path::{
    Operation, OperationBuilder, Parameter, ParameterBuilder, ParameterIn, PathItemType,
};
use utoipa::openapi::content::ContentBuilder;
use utoipa::openapi::response::{Response, ResponseBuilder};
use utoipa::openapi::schema::{
    ArrayBuilder, Components, ComponentsBuilder, KnownFormat, ObjectBuilder, Ref, Schema,
    SchemaFormat, SchemaType,
};
use utoipa::openapi::{Deprecated, RefOr, Required};
use utoipa::ToSchema;

/// Component schemas referenced by the catalog responses
pub fn components() -> Components {
    let schemas = [
        Product::schema(),
        ProblemDetails::schema(),
        ExceptionDetail::schema(),
    ];
    schemas
        .into_iter()
        .fold(ComponentsBuilder::new(), |builder, (name, schema)| {
            builder.schema(name, schema)
        })
        .build()
}

pub fn path_item_type(method: &Method) -> Option<PathItemType> {
    match method.as_str() {
        "GET" => Some(PathItemType::Get),
        "POST" => Some(PathItemType::Post),
        "PUT" => Some(PathItemType::Put),
        "DELETE" => Some(PathItemType::Delete),
        "PATCH" => Some(PathItemType::Patch),
        "HEAD" => Some(PathItemType::Head),
        "OPTIONS" => Some(PathItemType::Options),
        "TRACE" => Some(PathItemType::Trace),
        _ => None,
    }
}

/// Operation as declared on the route, before any filter runs
pub fn build_operation(route: &RouteDescriptor) -> Operation {
    let mut builder = OperationBuilder::new()
        .operation_id(Some(route.operation_id.clone()))
        .summary(route.summary.clone());

    if !route.tags.is_empty() {
        builder = builder.tags(Some(route.tags.clone()));
    }
    if route.deprecated {
        builder = builder.deprecated(Some(Deprecated::True));
    }
    for parameter in &route.parameters {
        builder = builder.parameter(build_parameter(parameter));
    }
    for (status, declared) in &route.responses {
        builder = builder.response(status.to_string(), build_response(declared, &route.produces));
    }

    builder.build()
}

fn build_parameter(parameter: &ParameterDescriptor) -> Parameter {
    let location = match parameter.location {
        ParameterLocation::Path => ParameterIn::Path,
        ParameterLocation::Query => ParameterIn::Query,
        ParameterLocation::Header => ParameterIn::Header,
    };
    let required = if parameter.required {
        Required::True
    } else {
        Required::False
    };
    let schema = ObjectBuilder::new()
        .schema_type(schema_type(&parameter.schema_type))
        .format(parameter.format.as_deref().map(schema_format))
        .build();

    ParameterBuilder::new()
        .name(parameter.name.clone())
        .parameter_in(location)
        .description(parameter.description.clone())
        .required(required)
        .schema(Some(schema))
        .build()
}

fn build_response(declared: &ResponseDescriptor, produces: &[String]) -> Response {
    let mut builder = ResponseBuilder::new().description(declared.description.clone());

    if let Some(ref component) = declared.schema {
        let schema: RefOr<Schema> = if declared.is_array {
            ArrayBuilder::new()
                .items(Ref::from_schema_name(component.clone()))
                .build()
                .into()
        } else {
            Ref::from_schema_name(component.clone()).into()
        };
        for media_type in produces {
            builder = builder.content(
                media_type.clone(),
                ContentBuilder::new().schema(schema.clone()).build(),
            );
        }
    }

    builder.build()
}

fn schema_type(name: &str) -> SchemaType {
    match name {
        "integer" => SchemaType::Integer,
        "number" => SchemaType::Number,
        "boolean" => SchemaType::Boolean,
        "array" => SchemaType::Array,
        "object" => SchemaType::Object,
        _ => SchemaType::String,
    }
}

fn schema_format(name: &str) -> SchemaFormat {
    match name {
        "int32" => SchemaFormat::KnownFormat(KnownFormat::Int32),
        "int64" => SchemaFormat::KnownFormat(KnownFormat::Int64),
        "float" => SchemaFormat::KnownFormat(KnownFormat::Float),
        "double" => SchemaFormat::KnownFormat(KnownFormat::Double),
        other => SchemaFormat::Custom(other.to_string()),
    }
}

pub fn has_response(operation: &Operation, status: u16) -> bool {
    operation
        .responses
        .responses
        .contains_key(&status.to_string())
}

/// Description of an inline response; `None` when absent or a reference
pub fn response_description(operation: &Operation, status: u16) -> Option<&str> {
    match operation.responses.responses.get(&status.to_string()) {
        Some(RefOr::T(response)) => Some(response.description.as_str()),
        _ => None,
    }
}

pub fn has_parameter(operation: &Operation, name: &str, location: ParameterIn) -> bool {
    operation.parameters.iter().flatten().any(|parameter| {
        parameter.name == name && parameter.parameter_in == location
    })
}

pub fn is_deprecated(operation: &Operation) -> bool {
    matches!(operation.deprecated, Some(Deprecated::True))
}
