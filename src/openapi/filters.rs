//! Operation filters run over every generated operation.
//!
//! The authorization filters only document requirements; nothing here enforces them.

use crate::openapi::document::{has_parameter, has_response};
use crate::routing::descriptor::{AuthorizationRequirement, RouteDescriptor};
use crate::routing::versioning::{ApiVersionDescriptor, ApiVersionRegistry};
use serde_json::Value;
use utoipa::openapi::path::{Operation, ParameterBuilder, ParameterIn};
use utoipa::openapi::response::ResponseBuilder;
use utoipa::openapi::schema::{ObjectBuilder, SchemaType};
use utoipa::openapi::{Deprecated, Required};

pub const UNAUTHORIZED_DESCRIPTION: &str =
    "Unauthorized - The user has not supplied the necessary credentials to access the resource.";
pub const FORBIDDEN_DESCRIPTION: &str =
    "Forbidden - The user does not have the necessary permissions to access the resource.";

/// What a filter can see about the operation being generated
pub struct OperationContext<'a> {
    pub route: &'a RouteDescriptor,
    pub group: &'a ApiVersionDescriptor,
    pub versions: &'a ApiVersionRegistry,
}

pub trait OperationFilter: Send + Sync {
    fn apply(&self, operation: &mut Operation, context: &OperationContext<'_>);
}

/// Documents the optional version query parameter and flags deprecated operations
pub struct ApiVersionOperationFilter;

impl OperationFilter for ApiVersionOperationFilter {
    fn apply(&self, operation: &mut Operation, context: &OperationContext<'_>) {
        if context.route.deprecated || context.group.deprecated {
            operation.deprecated = Some(Deprecated::True);
        }

        let name = context.versions.query_parameter();
        if has_parameter(operation, name, ParameterIn::Query) {
            return;
        }

        let schema = ObjectBuilder::new()
            .schema_type(SchemaType::String)
            .default(Some(Value::String(
                context.versions.default_version().to_string(),
            )))
            .build();
        let parameter = ParameterBuilder::new()
            .name(name)
            .parameter_in(ParameterIn::Query)
            .description(Some("The requested API version"))
            .required(Required::False)
            .schema(Some(schema))
            .build();
        operation.parameters.get_or_insert_with(Vec::new).push(parameter);
    }
}

/// Adds a 401 response to operations that deny anonymous callers
pub struct UnauthorizedResponseOperationFilter;

impl OperationFilter for UnauthorizedResponseOperationFilter {
    fn apply(&self, operation: &mut Operation, context: &OperationContext<'_>) {
        if has_response(operation, 401) {
            return;
        }

        let denies_anonymous = context
            .route
            .policy_requirements()
            .into_iter()
            .any(|requirement| matches!(requirement, AuthorizationRequirement::DenyAnonymous));
        if denies_anonymous {
            operation.responses.responses.insert(
                "401".to_string(),
                ResponseBuilder::new()
                    .description(UNAUTHORIZED_DESCRIPTION)
                    .build()
                    .into(),
            );
        }
    }
}

/// Adds a 403 response to operations with claim, role, name, operation or assertion checks
pub struct ForbiddenResponseOperationFilter;

impl OperationFilter for ForbiddenResponseOperationFilter {
    fn apply(&self, operation: &mut Operation, context: &OperationContext<'_>) {
        if has_response(operation, 403) {
            return;
        }

        let checks_permissions = context
            .route
            .policy_requirements()
            .into_iter()
            .any(AuthorizationRequirement::is_permission_check);
        if checks_permissions {
            operation.responses.responses.insert(
                "403".to_string(),
                ResponseBuilder::new()
                    .description(FORBIDDEN_DESCRIPTION)
                    .build()
                    .into(),
            );
        }
    }
}

/// Filters applied to every document, in order
pub fn default_filters() -> Vec<Box<dyn OperationFilter>> {
    vec![
        Box::new(ApiVersionOperationFilter),
        Box::new(ForbiddenResponseOperationFilter),
        Box::new(UnauthorizedResponseOperationFilter),
    ]
}
