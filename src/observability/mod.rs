// Structured logging
pub mod logging;

// Health checks and monitoring endpoints
pub mod health;

// Re-export commonly used types for convenience
pub use health::{HealthCheck, HealthChecker, HealthReport, HealthStatus};
pub use logging::init_tracing;
