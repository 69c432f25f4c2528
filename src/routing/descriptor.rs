//! Route metadata captured at registration time.
//!
//! Handlers are plain async functions, so everything the documentation generator needs to know
//! about a route (responses, parameters, authorization filters) is declared here alongside it.

use crate::routing::versioning::ApiVersion;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a filter was declared; more specific scopes run closer to the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FilterScope {
    Global,
    Controller,
    Action,
}

/// A single condition of an authorization policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationRequirement {
    /// The caller must be authenticated
    DenyAnonymous,
    /// The caller must carry a claim, optionally with one of the listed values
    Claims {
        claim_type: String,
        allowed_values: Vec<String>,
    },
    /// The caller must be in one of the roles
    Roles(Vec<String>),
    /// The caller must have this exact name
    Name(String),
    /// The caller must be allowed to perform the named operation
    Operation(String),
    /// Custom assertion, identified by name
    Assertion(String),
}

impl AuthorizationRequirement {
    /// Requirements that can fail for an authenticated caller
    pub fn is_permission_check(&self) -> bool {
        !matches!(self, Self::DenyAnonymous)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationPolicy {
    pub requirements: Vec<AuthorizationRequirement>,
}

impl AuthorizationPolicy {
    /// Policy that only requires an authenticated caller
    pub fn authenticated() -> Self {
        Self {
            requirements: vec![AuthorizationRequirement::DenyAnonymous],
        }
    }

    pub fn require(mut self, requirement: AuthorizationRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    Authorize(AuthorizationPolicy),
    AllowAnonymous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub scope: FilterScope,
    pub filter: Filter,
}

impl FilterDescriptor {
    pub fn new(scope: FilterScope, filter: Filter) -> Self {
        Self { scope, filter }
    }
}

/// A declared response of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub description: String,
    /// Name of a component schema
    pub schema: Option<String>,
    /// Whether the schema is an array of `schema`
    pub is_array: bool,
}

impl ResponseDescriptor {
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self {
            description: description.into(),
            schema: None,
            is_array: false,
        }
    }

    pub fn with_schema<S: Into<String>>(mut self, schema: S) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_array_of<S: Into<String>>(mut self, schema: S) -> Self {
        self.schema = Some(schema.into());
        self.is_array = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    pub description: Option<String>,
    pub required: bool,
    pub schema_type: String,
    pub format: Option<String>,
}

impl ParameterDescriptor {
    /// Required path parameter
    pub fn path<S: Into<String>>(name: S, schema_type: &str, format: Option<&str>) -> Self {
        Self {
            name: name.into(),
            location: ParameterLocation::Path,
            description: None,
            required: true,
            schema_type: schema_type.to_string(),
            format: format.map(str::to_string),
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Everything known about one routed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub operation_id: String,
    pub method: Method,
    /// axum path pattern, e.g. `/api/catalog/:id`
    pub path: String,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub api_version: ApiVersion,
    pub deprecated: bool,
    pub parameters: Vec<ParameterDescriptor>,
    pub responses: BTreeMap<u16, ResponseDescriptor>,
    pub produces: Vec<String>,
    /// Ordered least specific first
    pub filters: Vec<FilterDescriptor>,
}

impl RouteDescriptor {
    pub fn new<S: Into<String>, P: Into<String>>(
        operation_id: S,
        method: Method,
        path: P,
        api_version: ApiVersion,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            method,
            path: path.into(),
            summary: None,
            tags: Vec::new(),
            api_version,
            deprecated: false,
            parameters: Vec::new(),
            responses: BTreeMap::new(),
            produces: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn with_summary<S: Into<String>>(mut self, summary: S) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_response(mut self, status: u16, response: ResponseDescriptor) -> Self {
        self.responses.insert(status, response);
        self
    }

    pub fn with_produces(mut self, media_types: &[&str]) -> Self {
        self.produces = media_types.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_filter(mut self, scope: FilterScope, filter: Filter) -> Self {
        self.filters.push(FilterDescriptor::new(scope, filter));
        self.filters.sort_by_key(|descriptor| descriptor.scope);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Path in OpenAPI template form: `/api/catalog/{id}`
    pub fn openapi_path(&self) -> String {
        self.path
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => format!("{{{}}}", name),
                None => segment.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Authorization requirements in effect, most specific filter first.
    ///
    /// Stops at the first `AllowAnonymous`, so nothing declared above it contributes.
    pub fn policy_requirements(&self) -> Vec<&AuthorizationRequirement> {
        let mut requirements = Vec::new();
        for descriptor in self.filters.iter().rev() {
            match &descriptor.filter {
                Filter::AllowAnonymous => break,
                Filter::Authorize(policy) => requirements.extend(policy.requirements.iter()),
            }
        }
        requirements
    }
}

/// Metadata shared by every action of a controller
#[derive(Debug, Clone, Default)]
pub struct ControllerDescriptor {
    pub name: String,
    pub responses: BTreeMap<u16, ResponseDescriptor>,
    pub filters: Vec<Filter>,
}

impl ControllerDescriptor {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_response(mut self, status: u16, response: ResponseDescriptor) -> Self {
        self.responses.insert(status, response);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Merge controller metadata into an action; the action's own declarations win.
    pub fn apply(&self, mut route: RouteDescriptor) -> RouteDescriptor {
        for (status, response) in &self.responses {
            route
                .responses
                .entry(*status)
                .or_insert_with(|| response.clone());
        }
        for filter in &self.filters {
            route
                .filters
                .push(FilterDescriptor::new(FilterScope::Controller, filter.clone()));
        }
        route.filters.sort_by_key(|descriptor| descriptor.scope);
        if !route.tags.contains(&self.name) {
            route.tags.insert(0, self.name.clone());
        }
        route
    }
}
