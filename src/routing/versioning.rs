//! # API Versioning
//!
//! Versions are selected with a query parameter (`?api-version=1.0` by default). Every route
//! declares the version it belongs to; the registry collects those declarations into the
//! version descriptions used by the documentation generator and the version-reporting headers.
//!
//! ## Rules
//! - No parameter: the configured default version (when `assume_default_when_unspecified`)
//! - Malformed value: `400 Bad Request`
//! - Well-formed but undeclared version: `400 Bad Request`

use crate::core::config::ApiVersioningSettings;
use crate::core::error::{CatalogError, CatalogResult};
use crate::routing::descriptor::RouteDescriptor;
use crate::server::state::AppState;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const SUPPORTED_VERSIONS_HEADER: &str = "api-supported-versions";
pub const DEPRECATED_VERSIONS_HEADER: &str = "api-deprecated-versions";

/// A `major.minor` API version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Documentation group name: `v1` for `1.0`, `v1.1` for `1.1`.
    pub fn group_name(&self) -> String {
        if self.minor == 0 {
            format!("v{}", self.major)
        } else {
            format!("v{}.{}", self.major, self.minor)
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidApiVersion {
            value: s.to_string(),
        };

        let trimmed = s.trim();
        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (trimmed, "0"),
        };

        let is_numeric = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !is_numeric(major) || !is_numeric(minor) {
            return Err(invalid());
        }

        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// One documented API version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersionDescriptor {
    pub version: ApiVersion,
    pub deprecated: bool,
    pub group_name: String,
}

/// All versions declared by the application's routes
#[derive(Debug, Clone)]
pub struct ApiVersionRegistry {
    /// Newest first
    descriptions: Vec<ApiVersionDescriptor>,
    default_version: ApiVersion,
    query_parameter: String,
    assume_default: bool,
}

impl ApiVersionRegistry {
    /// Collect the distinct versions declared by `routes`.
    ///
    /// A version counts as deprecated only when every route declaring it is deprecated.
    pub fn from_routes(
        routes: &[RouteDescriptor],
        settings: &ApiVersioningSettings,
    ) -> CatalogResult<Self> {
        let default_version: ApiVersion = settings.default_version.parse()?;

        let mut versions: BTreeMap<ApiVersion, bool> = BTreeMap::new();
        for route in routes {
            versions
                .entry(route.api_version)
                .and_modify(|deprecated| *deprecated &= route.deprecated)
                .or_insert(route.deprecated);
        }
        if versions.is_empty() {
            versions.insert(default_version, false);
        }

        let descriptions = versions
            .into_iter()
            .rev()
            .map(|(version, deprecated)| ApiVersionDescriptor {
                version,
                deprecated,
                group_name: version.group_name(),
            })
            .collect();

        Ok(Self {
            descriptions,
            default_version,
            query_parameter: settings.query_parameter.clone(),
            assume_default: settings.assume_default_when_unspecified,
        })
    }

    /// Version descriptions, newest first
    pub fn descriptions(&self) -> &[ApiVersionDescriptor] {
        &self.descriptions
    }

    pub fn default_version(&self) -> ApiVersion {
        self.default_version
    }

    pub fn query_parameter(&self) -> &str {
        &self.query_parameter
    }

    pub fn find_group(&self, group_name: &str) -> Option<&ApiVersionDescriptor> {
        self.descriptions
            .iter()
            .find(|description| description.group_name == group_name)
    }

    pub fn is_supported(&self, version: ApiVersion) -> bool {
        self.descriptions
            .iter()
            .any(|description| description.version == version)
    }

    /// Comma separated list for the `api-supported-versions` header, ascending
    pub fn supported_header(&self) -> String {
        self.joined(|description| !description.deprecated)
    }

    /// Comma separated list for the `api-deprecated-versions` header, ascending
    pub fn deprecated_header(&self) -> String {
        self.joined(|description| description.deprecated)
    }

    fn joined<F>(&self, predicate: F) -> String
    where
        F: Fn(&ApiVersionDescriptor) -> bool,
    {
        self.descriptions
            .iter()
            .rev()
            .filter(|description| predicate(description))
            .map(|description| description.version.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Resolve the version requested by a raw query string
    pub fn resolve(&self, query: Option<&str>) -> CatalogResult<ApiVersion> {
        let requested = query.and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key.eq_ignore_ascii_case(&self.query_parameter))
                .map(|(_, value)| value.into_owned())
        });

        let Some(raw) = requested else {
            if self.assume_default {
                return Ok(self.default_version);
            }
            return Err(CatalogError::InvalidApiVersion {
                value: String::new(),
            });
        };

        let version: ApiVersion = raw.parse()?;
        if !self.is_supported(version) {
            return Err(CatalogError::UnsupportedApiVersion {
                requested: raw,
                supported: self.supported_header(),
            });
        }
        Ok(version)
    }
}

/// The API version selected for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedApiVersion(pub ApiVersion);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestedApiVersion {
    type Rejection = CatalogError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state.versions.resolve(parts.uri.query()).map(RequestedApiVersion)
    }
}

/// Adds `api-supported-versions` / `api-deprecated-versions` to versioned responses.
pub async fn report_api_versions(State(state): State<AppState>, mut response: Response) -> Response {
    if !state.config.api_versioning.report_api_versions {
        return response;
    }

    let headers = response.headers_mut();
    for (name, value) in [
        (SUPPORTED_VERSIONS_HEADER, state.versions.supported_header()),
        (DEPRECATED_VERSIONS_HEADER, state.versions.deprecated_header()),
    ] {
        if value.is_empty() {
            continue;
        }
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
    response
}
