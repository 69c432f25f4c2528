//! Core building blocks shared by every other module

pub mod config;
pub mod error;

pub use config::{AppConfig, ConfigSources, HostEnvironment};
pub use error::{CatalogError, CatalogResult, ProblemDetails};
