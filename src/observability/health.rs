//! # Health Checking System
//!
//! Liveness and readiness endpoints for orchestrators.
//!
//! ## Key Features
//! - `/api/health/live` runs no checks: the process answering is proof of life
//! - `/api/health/ready` runs every registered check and aggregates the results
//! - Unhealthy reports answer `503 Service Unavailable`
//!
//! ## Rust Concepts Used
//! - `async_trait` for async methods in traits
//! - `Arc<dyn HealthCheck>` so checks are shared across requests

use crate::server::state::AppState;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const LIVE_PATH: &str = "/api/health/live";
pub const READY_PATH: &str = "/api/health/ready";

/// Overall health status of the service or a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Ready to receive traffic
    Healthy,
    /// Partially degraded but still functional
    Degraded,
    /// Should not receive traffic
    Unhealthy,
}

/// Outcome of one health check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl HealthCheckResult {
    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy, None)
    }

    pub fn degraded<S: Into<String>>(description: S) -> Self {
        Self::new(HealthStatus::Degraded, Some(description.into()))
    }

    pub fn unhealthy<S: Into<String>>(description: S) -> Self {
        Self::new(HealthStatus::Unhealthy, Some(description.into()))
    }

    fn new(status: HealthStatus, description: Option<String>) -> Self {
        Self {
            status,
            description,
            duration: Duration::ZERO,
            tags: Vec::new(),
        }
    }
}

/// A probe of one dependency
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    fn tags(&self) -> Vec<String> {
        Vec::new()
    }

    async fn check(&self) -> HealthCheckResult;
}

/// Aggregated health status with individual check results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(with = "humantime_serde")]
    pub total_duration: Duration,
    pub timestamp: DateTime<Utc>,
    pub entries: BTreeMap<String, HealthCheckResult>,
}

impl HealthReport {
    pub fn new(entries: BTreeMap<String, HealthCheckResult>, total_duration: Duration) -> Self {
        Self {
            status: Self::aggregate_status(&entries),
            total_duration,
            timestamp: Utc::now(),
            entries,
        }
    }

    /// Worst status wins; no checks means healthy
    fn aggregate_status(entries: &BTreeMap<String, HealthCheckResult>) -> HealthStatus {
        let statuses = entries.values().map(|entry| entry.status);
        if statuses.clone().any(|status| status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if statuses.clone().any(|status| status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        }
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Registry of health checks
#[derive(Clone, Default)]
pub struct HealthChecker {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check accepted by `predicate`
    pub async fn run<F>(&self, predicate: F) -> HealthReport
    where
        F: Fn(&dyn HealthCheck) -> bool,
    {
        let started = Instant::now();
        let mut entries = BTreeMap::new();

        for check in self.checks.iter().filter(|check| predicate(check.as_ref())) {
            let check_started = Instant::now();
            let mut result = check.check().await;
            result.duration = check_started.elapsed();
            result.tags = check.tags();

            if result.status != HealthStatus::Healthy {
                warn!(
                    check = check.name(),
                    status = ?result.status,
                    description = result.description.as_deref().unwrap_or_default(),
                    "Health check not healthy"
                );
            }
            entries.insert(check.name().to_string(), result);
        }

        let report = HealthReport::new(entries, started.elapsed());
        debug!(status = ?report.status, checks = report.entries.len(), "Health report");
        report
    }
}

/// `GET /api/health/live`
pub async fn live(State(state): State<AppState>) -> HealthReport {
    state.health.run(|_| false).await
}

/// `GET /api/health/ready`
pub async fn ready(State(state): State<AppState>) -> HealthReport {
    // TODO: filter on a "ready" tag once dependency checks that only gate readiness are registered
    state.health.run(|_| true).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(LIVE_PATH, get(live))
        .route(READY_PATH, get(ready))
}
