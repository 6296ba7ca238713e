use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::command::Language;
use crate::shared::media::MediaType;

/// Environment variable naming the settings file (without extension).
pub const CONFIG_ENV: &str = "GATEWAY_CONFIG";
pub const DEFAULT_CONFIG: &str = "config/gateway";
const ENV_PREFIX: &str = "GATEWAY";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub insight: InsightConfig,
    #[serde(default)]
    pub negotiation: NegotiationConfig,
    #[serde(default)]
    pub engines: Vec<EngineSettings>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Invocations executing at the same time.
    pub size: usize,
    /// Admitted submissions allowed to wait for a worker.
    pub queue_depth: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 4,
            queue_depth: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub timeout_ms: u64,
    /// Default row guard for engines that do not set their own.
    pub max_rows: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_rows: 10_000,
        }
    }
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub channel_capacity: usize,
    /// Adds the debug cause chain to error payloads.
    pub include_trace: bool,
    pub heartbeat_ms: u64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            include_trace: false,
            heartbeat_ms: 15_000,
        }
    }
}

impl InsightConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Used when a client names no concrete media type.
    pub default_accept: Vec<MediaType>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            default_accept: vec![MediaType::new("application", "xml")],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EngineSettings {
    Sql(SqlSettings),
    Sparql(SparqlSettings),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlSettings {
    pub language: Option<Language>,
    pub database: PathBuf,
    /// Leading keywords accepted; absent means any.
    pub allow: Option<Vec<String>>,
    #[serde(default)]
    pub read_only: bool,
    pub max_rows: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlSettings {
    pub language: Option<Language>,
    /// Turtle file loaded at startup.
    pub dataset: Option<PathBuf>,
    #[serde(default)]
    pub allow_federated: bool,
    #[serde(default)]
    pub allow_update: bool,
    pub max_rows: Option<usize>,
}

/// Loads settings from `path`, or from `$GATEWAY_CONFIG`, or from
/// `config/gateway`, overlaid by `GATEWAY__SECTION__KEY` variables.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, config::ConfigError> {
    let config_path = match path {
        Some(path) => path.to_string_lossy().into_owned(),
        None => env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string()),
    };

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
