//! Route metadata, API version selection and content negotiation

pub mod descriptor;
pub mod negotiation;
pub mod versioning;

pub use descriptor::{
    AuthorizationPolicy, AuthorizationRequirement, ControllerDescriptor, Filter, FilterDescriptor,
    FilterScope, ParameterDescriptor, ParameterLocation, ResponseDescriptor, RouteDescriptor,
};
pub use negotiation::{negotiate, MediaType, Negotiated, NegotiatedJson};
pub use versioning::{ApiVersion, ApiVersionDescriptor, ApiVersionRegistry, RequestedApiVersion};
