//! # Catalog Server
//!
//! Builds the router from the catalog, health and documentation routes, wraps it in the
//! response pipeline and serves it until a shutdown signal arrives.

pub mod state;

pub use state::AppState;

use crate::catalog;
use crate::core::config::AppConfig;
use crate::core::error::{CatalogError, CatalogResult};
use crate::middleware::{apply_pipeline, normalize_paths};
use crate::observability::health;
use crate::openapi;
use axum::extract::OriginalUri;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

/// Full application router with the pipeline applied, matching paths case-insensitively and
/// ignoring trailing slashes
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .merge(catalog::router(state.clone()))
        .merge(health::router())
        .merge(openapi::router(&state))
        .fallback(route_not_found);

    normalize_paths(apply_pipeline(routes, state))
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> CatalogError {
    CatalogError::RouteNotMatched {
        path: uri.path().to_string(),
    }
}

pub struct CatalogServer {
    state: AppState,
}

impl CatalogServer {
    pub fn new(config: AppConfig) -> CatalogResult<Self> {
        Ok(Self {
            state: AppState::new(config)?,
        })
    }

    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn bind_address(&self) -> CatalogResult<SocketAddr> {
        let server = &self.state.config.server;
        format!("{}:{}", server.bind_address, server.port)
            .parse()
            .map_err(|e| CatalogError::config(format!("Invalid bind address: {}", e)))
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> CatalogResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.bind_address()?;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| CatalogError::config(format!("Failed to bind {}: {}", address, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> CatalogResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(address = %listener.local_addr()?, "Catalog API listening");

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CatalogError::internal(format!("Server error: {}", e)))
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
