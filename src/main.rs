//! # Catalog API - Main Entry Point
//!
//! Parses the command line, loads the layered configuration, installs logging and serves the
//! catalog until SIGINT or SIGTERM.

use catalog_api::core::config::resolve_environment;
use catalog_api::observability::init_tracing;
use catalog_api::server::shutdown_signal;
use catalog_api::{AppConfig, CatalogResult, CatalogServer, ConfigSources};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, info_span, Instrument};

/// Read-only bookstore catalog HTTP API
#[derive(Debug, Parser)]
#[command(name = "catalog-api", version, about)]
struct Cli {
    /// Hosting environment (Development, Staging, Production)
    #[arg(long, env = "CATALOG_ENVIRONMENT")]
    environment: Option<String>,

    /// Directory holding appsettings.json and appsettings.{Environment}.json
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Key-per-file secrets directory
    #[arg(long, default_value = "configuration")]
    secrets_dir: PathBuf,

    /// Listen port, shorthand for --set server.port=PORT
    #[arg(long)]
    port: Option<u16>,

    /// Configuration override, highest priority (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    overrides: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Host terminated unexpectedly");
            eprintln!("catalog-api: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CatalogResult<()> {
    let environment = resolve_environment(cli.environment.as_deref())?;

    let mut sources = ConfigSources::new(environment)
        .with_config_dir(cli.config_dir)
        .with_secrets_dir(Some(cli.secrets_dir));
    if let Some(port) = cli.port {
        sources = sources.with_override("server.port", port.to_string());
    }
    for (key, value) in cli.overrides {
        sources = sources.with_override(key, value);
    }

    let config = AppConfig::load(&sources).await?;
    init_tracing(&config.logging, config.environment)?;

    let application = env!("CARGO_PKG_NAME");
    let span = info_span!("host", application, environment = %environment);
    let server = CatalogServer::new(config)?;

    async move {
        info!("Started {} in {} mode.", application, environment);

        let result = server.run(shutdown_signal()).await;
        info!("Stopped {} in {} mode.", application, environment);
        result
    }
    .instrument(span)
    .await
}
