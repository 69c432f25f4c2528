//! Content negotiation for JSON responses.
//!
//! Only JSON flavours are produced. `text/json` and `text/plain` are deliberately absent, so a
//! client asking for nothing but those gets `406 Not Acceptable`.

use crate::core::error::CatalogError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::cmp::Ordering;

/// Media types the service understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Json,
    ProblemJson,
    RestfulJson,
    /// Accepted on input only
    JsonPatch,
}

impl MediaType {
    /// Output formats in preference order
    pub const OUTPUT: [MediaType; 3] = [Self::Json, Self::ProblemJson, Self::RestfulJson];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::ProblemJson => "application/problem+json",
            Self::RestfulJson => "application/vnd.restful+json",
            Self::JsonPatch => "application/json-patch+json",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let essence = value.split(';').next()?.trim();
        [Self::Json, Self::ProblemJson, Self::RestfulJson, Self::JsonPatch]
            .into_iter()
            .find(|media_type| media_type.as_str().eq_ignore_ascii_case(essence))
    }

    pub fn is_output(&self) -> bool {
        Self::OUTPUT.contains(self)
    }
}

#[derive(Debug)]
struct MediaRange {
    range: String,
    quality: f32,
}

fn parse_accept(accept: &str) -> Vec<MediaRange> {
    let mut ranges: Vec<MediaRange> = accept
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let range = parts.next()?.trim().to_ascii_lowercase();
            if range.is_empty() {
                return None;
            }
            let mut quality = 1.0;
            for param in parts {
                if let Some((name, value)) = param.split_once('=') {
                    if name.trim().eq_ignore_ascii_case("q") {
                        quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
                    }
                }
            }
            Some(MediaRange { range, quality })
        })
        .collect();

    // Stable, so equal weights keep the client's order
    ranges.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
    ranges
}

/// Pick the response media type for an `Accept` header value
pub fn negotiate(accept: Option<&str>) -> Result<MediaType, CatalogError> {
    let accept = match accept.map(str::trim) {
        None | Some("") => return Ok(MediaType::Json),
        Some(accept) => accept,
    };

    let ranges = parse_accept(accept);
    let excluded: Vec<MediaType> = ranges
        .iter()
        .filter(|range| range.quality <= 0.0)
        .filter_map(|range| MediaType::parse(&range.range))
        .collect();
    let allowed = |media_type: &MediaType| !excluded.contains(media_type);

    for range in ranges.iter().filter(|range| range.quality > 0.0) {
        if range.range == "*/*" || range.range == "application/*" {
            if let Some(media_type) = MediaType::OUTPUT.into_iter().find(allowed) {
                return Ok(media_type);
            }
            continue;
        }
        if let Some(media_type) = MediaType::parse(&range.range) {
            if media_type.is_output() && allowed(&media_type) {
                return Ok(media_type);
            }
        }
    }

    Err(CatalogError::NotAcceptable {
        accept: accept.to_string(),
    })
}

/// The response media type selected from the request's `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated(pub MediaType);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Negotiated
where
    S: Send + Sync,
{
    type Rejection = CatalogError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let accept = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        negotiate(accept).map(Negotiated)
    }
}

/// JSON body written with the negotiated media type
#[derive(Debug, Clone)]
pub struct NegotiatedJson<T> {
    pub media_type: MediaType,
    pub indented: bool,
    pub body: T,
}

impl<T: Serialize> IntoResponse for NegotiatedJson<T> {
    fn into_response(self) -> Response {
        let serialized = if self.indented {
            serde_json::to_vec_pretty(&self.body)
        } else {
            serde_json::to_vec(&self.body)
        };

        match serialized {
            Ok(bytes) => {
                let content_type = format!("{}; charset=utf-8", self.media_type.as_str());
                match HeaderValue::from_str(&content_type) {
                    Ok(value) => ([(header::CONTENT_TYPE, value)], bytes).into_response(),
                    Err(_) => CatalogError::internal("invalid content type").into_response(),
                }
            }
            Err(err) => CatalogError::from(err).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_accept_defaults_to_json() {
        assert_eq!(negotiate(None).unwrap(), MediaType::Json);
        assert_eq!(negotiate(Some("  ")).unwrap(), MediaType::Json);
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(negotiate(Some("*/*")).unwrap(), MediaType::Json);
        assert_eq!(negotiate(Some("application/*")).unwrap(), MediaType::Json);
        assert_eq!(
            negotiate(Some("application/json;q=0, */*")).unwrap(),
            MediaType::ProblemJson
        );
    }

    #[test]
    fn test_exact_types() {
        assert_eq!(
            negotiate(Some("application/vnd.restful+json")).unwrap(),
            MediaType::RestfulJson
        );
        assert_eq!(
            negotiate(Some("text/html, application/problem+json")).unwrap(),
            MediaType::ProblemJson
        );
    }

    #[test]
    fn test_quality_ordering() {
        assert_eq!(
            negotiate(Some("application/json;q=0.5, application/vnd.restful+json;q=0.9")).unwrap(),
            MediaType::RestfulJson
        );
        assert_eq!(
            negotiate(Some("application/vnd.restful+json, application/json")).unwrap(),
            MediaType::RestfulJson
        );
    }

    #[test]
    fn test_not_acceptable() {
        assert!(matches!(
            negotiate(Some("text/plain")),
            Err(CatalogError::NotAcceptable { .. })
        ));
        assert!(negotiate(Some("text/json")).is_err());
        assert!(negotiate(Some("application/json-patch+json")).is_err());
        assert!(negotiate(Some("application/json;q=0")).is_err());
    }

    #[test]
    fn test_negotiated_json_content_type() {
        let response = NegotiatedJson {
            media_type: MediaType::RestfulJson,
            indented: false,
            body: serde_json::json!({ "id": 1 }),
        }
        .into_response();

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/vnd.restful+json; charset=utf-8"
        );
    }
}
