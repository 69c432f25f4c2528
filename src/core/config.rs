//! # Configuration Module
//!
//! All settings live in one [`AppConfig`]. It is assembled from layered sources, lowest priority
//! first:
//!
//! 1. built-in defaults
//! 2. `appsettings.json` (or `.yaml`) in the config directory
//! 3. `appsettings.{Environment}.json` (or `.yaml`)
//! 4. a key-per-file secrets directory (file name is the key, contents the value)
//! 5. environment variables carrying the `CATALOG_` prefix
//! 6. command-line `--set key=value` overrides
//!
//! Override keys may be written `Section__Field`, `Section:Field` or `section.field`; each
//! segment is normalised to snake_case before it is applied to the merged document.

use crate::core::error::{CatalogError, CatalogResult};
use crate::routing::versioning::ApiVersion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Prefix of environment variables that feed configuration.
pub const ENV_PREFIX: &str = "CATALOG_";

/// Hosting environment the process runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HostEnvironment {
    Development,
    Staging,
    #[default]
    Production,
}

impl HostEnvironment {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "Development",
            Self::Staging => "Staging",
            Self::Production => "Production",
        }
    }
}

impl fmt::Display for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostEnvironment {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(CatalogError::config(format!(
                "Unknown environment '{}'",
                other
            ))),
        }
    }
}

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hosting environment; set by the loader, not by files
    pub environment: HostEnvironment,
    pub server: ServerSettings,
    pub compression: CompressionSettings,
    pub forwarded_headers: ForwardedHeadersSettings,
    pub cors: CorsSettings,
    pub hsts: HstsSettings,
    pub api_versioning: ApiVersioningSettings,
    pub response_caching: ResponseCachingSettings,
    pub logging: LoggingSettings,
    pub json: JsonSettings,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Response compression settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    pub enabled: bool,

    /// Compress over https too. Off by default (BREACH).
    pub enable_for_https: bool,

    /// Media types compressed in addition to the built-in defaults
    pub mime_types: Vec<String>,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_for_https: false,
            mime_types: vec![
                "application/problem+json".to_string(),
                "application/vnd.restful+json".to_string(),
            ],
        }
    }
}

/// Which proxies may rewrite the client address and scheme
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardedHeadersSettings {
    /// Trusted proxy addresses; empty means proxy headers are ignored
    pub known_proxies: Vec<IpAddr>,

    /// Number of `X-Forwarded-For` entries processed, from the right
    pub forward_limit: usize,
}

impl Default for ForwardedHeadersSettings {
    fn default() -> Self {
        Self {
            known_proxies: Vec::new(),
            forward_limit: 1,
        }
    }
}

/// Named CORS policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub policy_name: String,

    /// Allowed origins (use "*" for any origin)
    pub allowed_origins: Vec<String>,

    /// Allowed methods (use "*" for any method)
    pub allowed_methods: Vec<String>,

    /// Allowed headers (use "*" for any header)
    pub allowed_headers: Vec<String>,

    pub exposed_headers: Vec<String>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            policy_name: "AllowAny".to_string(),
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["*".to_string()],
            allowed_headers: vec!["*".to_string()],
            exposed_headers: vec![
                "api-supported-versions".to_string(),
                "api-deprecated-versions".to_string(),
            ],
        }
    }
}

/// Strict-Transport-Security header settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HstsSettings {
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
    pub include_subdomains: bool,
    pub preload: bool,
}

impl Default for HstsSettings {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(31_536_000), // 1 year
            include_subdomains: true,
            preload: true,
        }
    }
}

impl HstsSettings {
    pub fn header_value(&self) -> String {
        let mut value = format!("max-age={}", self.max_age.as_secs());
        if self.include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.preload {
            value.push_str("; preload");
        }
        value
    }
}

/// API version selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiVersioningSettings {
    pub default_version: String,

    /// Unversioned requests get the default instead of a 400
    pub assume_default_when_unspecified: bool,

    pub query_parameter: String,

    /// Emit `api-supported-versions` / `api-deprecated-versions`
    pub report_api_versions: bool,
}

impl Default for ApiVersioningSettings {
    fn default() -> Self {
        Self {
            default_version: "1.0".to_string(),
            assume_default_when_unspecified: true,
            query_parameter: "api-version".to_string(),
            report_api_versions: true,
        }
    }
}

/// In-memory response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseCachingSettings {
    pub enabled: bool,
    pub max_entries: usize,
    pub max_body_bytes: usize,

    /// `Cache-Control: public, max-age` emitted by catalog reads; 0 disables the header
    pub catalog_max_age: u64,
}

impl Default for ResponseCachingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1024,
            max_body_bytes: 1024 * 1024, // 1MB
            catalog_max_age: 0,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,

    /// Defaults to text in Development and JSON elsewhere
    pub format: Option<LogFormat>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: None,
        }
    }
}

impl LoggingSettings {
    pub fn effective_format(&self, environment: HostEnvironment) -> LogFormat {
        self.format.unwrap_or(if environment.is_development() {
            LogFormat::Text
        } else {
            LogFormat::Json
        })
    }
}

/// JSON output options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonSettings {
    /// Pretty print; defaults to on in Development only
    pub indented: Option<bool>,
}

impl JsonSettings {
    pub fn is_indented(&self, environment: HostEnvironment) -> bool {
        self.indented.unwrap_or(environment.is_development())
    }
}

/// Where configuration is read from
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub environment: HostEnvironment,
    pub config_dir: PathBuf,
    pub secrets_dir: Option<PathBuf>,
    pub env_prefix: String,
    pub overrides: Vec<(String, String)>,
}

impl ConfigSources {
    pub fn new(environment: HostEnvironment) -> Self {
        Self {
            environment,
            config_dir: PathBuf::from("config"),
            secrets_dir: Some(PathBuf::from("configuration")),
            env_prefix: ENV_PREFIX.to_string(),
            overrides: Vec::new(),
        }
    }

    pub fn with_config_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config_dir = dir.into();
        self
    }

    pub fn with_secrets_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.secrets_dir = dir;
        self
    }

    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn with_override<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }
}

/// Resolve the hosting environment: explicit value, then `CATALOG_ENVIRONMENT`, then Production.
pub fn resolve_environment(explicit: Option<&str>) -> CatalogResult<HostEnvironment> {
    match explicit {
        Some(name) => name.parse(),
        None => match std::env::var(format!("{}ENVIRONMENT", ENV_PREFIX)) {
            Ok(name) => name.parse(),
            Err(_) => Ok(HostEnvironment::default()),
        },
    }
}

impl AppConfig {
    /// Build the configuration from every layered source and validate it
    pub async fn load(sources: &ConfigSources) -> CatalogResult<Self> {
        let mut merged = serde_json::to_value(AppConfig::default())?;

        let environment_file = format!("appsettings.{}", sources.environment);
        for name in ["appsettings", environment_file.as_str()] {
            if let Some(layer) = read_settings_file(&sources.config_dir, name).await? {
                merge_values(&mut merged, layer);
            }
        }

        if let Some(ref dir) = sources.secrets_dir {
            for (key, value) in read_key_per_file(dir).await? {
                apply_override(&mut merged, &key, &value);
            }
        }

        let mut env_vars: Vec<(String, String)> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(&sources.env_prefix)
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect();
        env_vars.sort();
        for (key, value) in &env_vars {
            apply_override(&mut merged, key, value);
        }

        for (key, value) in &sources.overrides {
            apply_override(&mut merged, key, value);
        }

        if let Value::Object(ref mut root) = merged {
            root.insert(
                "environment".to_string(),
                Value::String(sources.environment.as_str().to_string()),
            );
        }

        let config: AppConfig = serde_json::from_value(merged)
            .map_err(|e| CatalogError::config(format!("Failed to bind configuration: {}", e)))?;
        config.validate()?;

        info!(
            environment = %config.environment,
            config_dir = %sources.config_dir.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validation that reports every problem at once
    pub fn validate(&self) -> CatalogResult<()> {
        let mut errors = Vec::new();

        if self.server.bind_address.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "server.bind_address '{}' is not an IP address",
                self.server.bind_address
            ));
        }

        if self
            .api_versioning
            .default_version
            .parse::<ApiVersion>()
            .is_err()
        {
            errors.push(format!(
                "api_versioning.default_version '{}' is not a version",
                self.api_versioning.default_version
            ));
        }

        if self.api_versioning.query_parameter.trim().is_empty() {
            errors.push("api_versioning.query_parameter cannot be empty".to_string());
        }

        if self.forwarded_headers.forward_limit == 0 {
            errors.push("forwarded_headers.forward_limit must be greater than 0".to_string());
        }

        if self.hsts.max_age.is_zero() {
            errors.push("hsts.max_age must be greater than 0".to_string());
        }

        if self.cors.allowed_origins.is_empty() {
            errors.push("cors.allowed_origins cannot be empty".to_string());
        }

        if self.response_caching.enabled && self.response_caching.max_entries == 0 {
            errors.push("response_caching.max_entries must be greater than 0".to_string());
        }

        if self
            .logging
            .level
            .parse::<tracing_subscriber::filter::LevelFilter>()
            .is_err()
        {
            errors.push(format!("logging.level '{}' is not a level", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::config(errors.join("; ")))
        }
    }
}

async fn read_settings_file(dir: &Path, name: &str) -> CatalogResult<Option<Value>> {
    let json_path = dir.join(format!("{}.json", name));
    if tokio::fs::try_exists(&json_path).await? {
        let content = tokio::fs::read_to_string(&json_path).await?;
        debug!(path = %json_path.display(), "Reading settings file");
        let value = serde_json::from_str(&content).map_err(|e| {
            CatalogError::config(format!("Failed to parse {}: {}", json_path.display(), e))
        })?;
        return Ok(Some(value));
    }

    let yaml_path = dir.join(format!("{}.yaml", name));
    if tokio::fs::try_exists(&yaml_path).await? {
        let content = tokio::fs::read_to_string(&yaml_path).await?;
        debug!(path = %yaml_path.display(), "Reading settings file");
        let value = serde_yaml::from_str(&content).map_err(|e| {
            CatalogError::config(format!("Failed to parse {}: {}", yaml_path.display(), e))
        })?;
        return Ok(Some(value));
    }

    Ok(None)
}

async fn read_key_per_file(dir: &Path) -> CatalogResult<Vec<(String, String)>> {
    if !tokio::fs::try_exists(dir).await? {
        return Ok(Vec::new());
    }

    let mut pairs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let key = entry.file_name().to_string_lossy().to_string();
        if key.starts_with('.') {
            continue;
        }
        let value = tokio::fs::read_to_string(entry.path()).await?;
        pairs.push((key, value.trim_end().to_string()));
    }
    pairs.sort();
    Ok(pairs)
}

/// Deep-merge `layer` into `base`; objects merge by key, everything else replaces.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                let key = to_snake_case(&key);
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn split_key(key: &str) -> Vec<String> {
    key.split("__")
        .flat_map(|part| part.split([':', '.']))
        .filter(|segment| !segment.is_empty())
        .map(to_snake_case)
        .collect()
}

fn to_snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    let mut previous_lower = false;
    for c in segment.chars() {
        if c.is_ascii_uppercase() {
            if previous_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            previous_lower = false;
        } else if c == '-' {
            out.push('_');
            previous_lower = false;
        } else {
            previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    out
}

/// Apply a flat `key=value` override; the value is typed after whatever it replaces.
fn apply_override(root: &mut Value, key: &str, raw: &str) {
    let segments = split_key(key);
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let typed = typed_value(map.get(last), raw);
        map.insert(last.clone(), typed);
    }
}

fn typed_value(existing: Option<&Value>, raw: &str) -> Value {
    match existing {
        Some(Value::String(_)) => Value::String(raw.to_string()),
        Some(Value::Array(_)) => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_array)
            .unwrap_or_else(|| {
                Value::Array(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(|item| Value::String(item.to_string()))
                        .collect(),
                )
            }),
        _ => serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn isolated(environment: HostEnvironment, dir: &Path) -> ConfigSources {
        ConfigSources::new(environment)
            .with_config_dir(dir)
            .with_secrets_dir(None)
            .with_env_prefix("CATALOG_UNIT_TEST_UNUSED_")
    }

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, HostEnvironment::Production);
        assert!(config.forwarded_headers.known_proxies.is_empty());
        assert!(!config.compression.enable_for_https);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            "development".parse::<HostEnvironment>().unwrap(),
            HostEnvironment::Development
        );
        assert_eq!(
            "Production".parse::<HostEnvironment>().unwrap(),
            HostEnvironment::Production
        );
        assert!("qa".parse::<HostEnvironment>().is_err());
    }

    #[test]
    fn test_hsts_header_value() {
        assert_eq!(
            HstsSettings::default().header_value(),
            "max-age=31536000; includeSubDomains; preload"
        );
    }

    #[test]
    fn test_key_normalisation() {
        assert_eq!(
            split_key("Compression__EnableForHttps"),
            vec!["compression", "enable_for_https"]
        );
        assert_eq!(
            split_key("COMPRESSION__ENABLE_FOR_HTTPS"),
            vec!["compression", "enable_for_https"]
        );
        assert_eq!(split_key("cors:PolicyName"), vec!["cors", "policy_name"]);
        assert_eq!(split_key("server.port"), vec!["server", "port"]);
    }

    #[test]
    fn test_override_keeps_string_fields_as_strings() {
        let mut value = serde_json::to_value(AppConfig::default()).unwrap();
        apply_override(&mut value, "api_versioning.default_version", "2.0");
        apply_override(&mut value, "server.port", "9090");
        apply_override(&mut value, "forwarded_headers.known_proxies", "10.0.0.1, 10.0.0.2");

        let config: AppConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.api_versioning.default_version, "2.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.forwarded_headers.known_proxies.len(), 2);
    }

    #[tokio::test]
    async fn test_layered_files() {
        let temp_dir = TempDir::new().unwrap();
        tokio::fs::write(
            temp_dir.path().join("appsettings.json"),
            r#"{ "Server": { "Port": 9000 }, "Logging": { "Level": "debug" } }"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            temp_dir.path().join("appsettings.Development.yaml"),
            "server:\n  port: 9100\njson:\n  indented: false\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load(&isolated(HostEnvironment::Development, temp_dir.path()))
            .await
            .unwrap();

        assert_eq!(config.environment, HostEnvironment::Development);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.json.is_indented(config.environment));
    }

    #[tokio::test]
    async fn test_environment_file_ignored_for_other_environments() {
        let temp_dir = TempDir::new().unwrap();
        tokio::fs::write(
            temp_dir.path().join("appsettings.Development.json"),
            r#"{ "server": { "port": 9100 } }"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load(&isolated(HostEnvironment::Production, temp_dir.path()))
            .await
            .unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[tokio::test]
    async fn test_key_per_file_and_command_line_precedence() {
        let config_dir = TempDir::new().unwrap();
        let secrets_dir = TempDir::new().unwrap();
        tokio::fs::write(secrets_dir.path().join("Server__Port"), "7000\n")
            .await
            .unwrap();
        tokio::fs::write(
            secrets_dir.path().join("Compression__EnableForHttps"),
            "true",
        )
        .await
        .unwrap();

        let sources = isolated(HostEnvironment::Staging, config_dir.path())
            .with_secrets_dir(Some(secrets_dir.path().to_path_buf()))
            .with_override("server.port", "7100");
        let config = AppConfig::load(&sources).await.unwrap();

        assert_eq!(config.server.port, 7100);
        assert!(config.compression.enable_for_https);
    }

    #[tokio::test]
    async fn test_environment_variable_overrides() {
        let temp_dir = TempDir::new().unwrap();
        std::env::set_var("CATALOG_CFG_TEST_HSTS__PRELOAD", "false");
        std::env::set_var("CATALOG_CFG_TEST_RESPONSE_CACHING__CATALOG_MAX_AGE", "30");

        let sources = ConfigSources::new(HostEnvironment::Production)
            .with_config_dir(temp_dir.path())
            .with_secrets_dir(None)
            .with_env_prefix("CATALOG_CFG_TEST_");
        let config = AppConfig::load(&sources).await.unwrap();

        assert!(!config.hsts.preload);
        assert_eq!(config.response_caching.catalog_max_age, 30);

        std::env::remove_var("CATALOG_CFG_TEST_HSTS__PRELOAD");
        std::env::remove_var("CATALOG_CFG_TEST_RESPONSE_CACHING__CATALOG_MAX_AGE");
    }

    #[tokio::test]
    async fn test_validation_errors_are_collected() {
        let temp_dir = TempDir::new().unwrap();
        let sources = isolated(HostEnvironment::Production, temp_dir.path())
            .with_override("api_versioning.default_version", "one")
            .with_override("server.bind_address", "not-an-ip");

        let error = AppConfig::load(&sources).await.unwrap_err();
        let message = error.to_string();
        assert!(message.contains("default_version"));
        assert!(message.contains("bind_address"));
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        tokio::fs::write(temp_dir.path().join("appsettings.json"), "{ not json")
            .await
            .unwrap();

        let result = AppConfig::load(&isolated(HostEnvironment::Production, temp_dir.path())).await;
        assert!(matches!(result, Err(CatalogError::Configuration { .. })));
    }
}
