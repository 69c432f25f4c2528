//! # Response Caching
//!
//! In-memory cache for safe reads. Only `GET`/`HEAD` responses with status 200 and a
//! `Cache-Control: public, max-age=N` header are stored, for `N` seconds. A request carrying
//! `no-cache` or `no-store` bypasses the cache.
//!
//! ## Rust Concepts Used
//! - `DashMap` for lock-free concurrent reads of cached entries
//! - `Bytes` so a hit clones the body without copying

use crate::core::config::ResponseCachingSettings;
use crate::core::error::CatalogError;
use crate::server::state::AppState;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A stored response
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub stored_at: Instant,
    pub max_age: Duration,
}

impl CachedResponse {
    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    pub fn is_fresh(&self) -> bool {
        self.age() < self.max_age
    }

    fn to_response(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        if let Ok(age) = HeaderValue::from_str(&self.age().as_secs().to_string()) {
            response.headers_mut().insert(header::AGE, age);
        }
        response
    }
}

/// Concurrent cache of responses keyed by method, uri and negotiation headers
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CachedResponse>,
    enabled: bool,
    max_entries: usize,
    max_body_bytes: usize,
}

impl ResponseCache {
    pub fn new(settings: &ResponseCachingSettings) -> Self {
        Self {
            entries: DashMap::new(),
            enabled: settings.enabled,
            max_entries: settings.max_entries,
            max_body_bytes: settings.max_body_bytes,
        }
    }

    pub fn key(method: &Method, uri: &str, headers: &HeaderMap) -> String {
        let value_of = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("")
        };
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}",
            method,
            uri,
            value_of(header::ACCEPT),
            value_of(header::ACCEPT_ENCODING)
        )
    }

    /// Fresh entry for `key`; stale entries are dropped
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let entry = self.entries.get(key)?.clone();
        if entry.is_fresh() {
            Some(entry)
        } else {
            self.entries.remove(key);
            None
        }
    }

    /// Store an entry; when full, expired entries are purged and the entry is skipped if
    /// there is still no room
    pub fn insert(&self, key: String, entry: CachedResponse) -> bool {
        if entry.body.len() > self.max_body_bytes {
            return false;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.purge_expired();
            if self.entries.len() >= self.max_entries {
                return false;
            }
        }
        self.entries.insert(key, entry);
        true
    }

    pub fn purge_expired(&self) {
        self.entries.retain(|_, entry| entry.is_fresh());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

fn directives(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|directive| directive.trim().to_ascii_lowercase())
        .filter(|directive| !directive.is_empty())
        .collect()
}

/// Whether the request asks to skip cached content
pub fn bypasses_cache(headers: &HeaderMap) -> bool {
    let directives = directives(headers);
    directives
        .iter()
        .any(|directive| directive == "no-cache" || directive == "no-store")
        || headers
            .get(header::PRAGMA)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.eq_ignore_ascii_case("no-cache"))
            .unwrap_or(false)
}

/// Shared lifetime from a response's `Cache-Control`, if it may be stored
pub fn storable_max_age(headers: &HeaderMap) -> Option<Duration> {
    let directives = directives(headers);
    if !directives.iter().any(|directive| directive == "public") {
        return None;
    }
    if directives
        .iter()
        .any(|directive| matches!(directive.as_str(), "private" | "no-store" | "no-cache"))
    {
        return None;
    }
    if headers.contains_key(header::SET_COOKIE) {
        return None;
    }

    let max_age = directives
        .iter()
        .find_map(|directive| directive.strip_prefix("s-maxage="))
        .or_else(|| {
            directives
                .iter()
                .find_map(|directive| directive.strip_prefix("max-age="))
        })?
        .parse::<u64>()
        .ok()?;
    (max_age > 0).then(|| Duration::from_secs(max_age))
}

pub async fn response_caching(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let cache = &state.cache;
    let method = request.method().clone();
    if !cache.enabled
        || !(method == Method::GET || method == Method::HEAD)
        || bypasses_cache(request.headers())
    {
        return next.run(request).await;
    }

    let key = ResponseCache::key(&method, &request.uri().to_string(), request.headers());
    if let Some(hit) = cache.get(&key) {
        trace!(uri = %request.uri(), "Response cache hit");
        return hit.to_response();
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }
    let Some(max_age) = storable_max_age(response.headers()) else {
        return response;
    };

    let (parts, body) = response.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => {
            return CatalogError::internal(format!("Failed to buffer response body: {}", e))
                .into_response()
        }
    };

    let stored = cache.insert(
        key,
        CachedResponse {
            status: parts.status,
            headers: parts.headers.clone(),
            body: body.clone(),
            stored_at: Instant::now(),
            max_age,
        },
    );
    debug!(stored, entries = cache.len(), "Response cache miss");

    Response::from_parts(parts, Body::from(body))
}
