use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::command::parser::NegotiationDefaults;
use crate::engine::errors::GatewayError;
use crate::engine::invocation::Engine;
use crate::engine::registry::{EngineRegistry, RegistryError};
use crate::engine::sparql::{SparqlEngine, SparqlEngineConfig};
use crate::engine::sql::{CommandWhitelist, SqlEngine, SqlEngineConfig};
use crate::insight::{Emitter, EventDraft, EventStream, Subject};
use crate::shared::config::{EngineSettings, Settings, SparqlSettings, SqlSettings};

const LOG_TARGET: &str = "frontend::context";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("cannot start engine: {0}")]
    Engine(#[from] GatewayError),

    #[error("invalid gateway setup: {0}")]
    Registry(#[from] RegistryError),
}

/// Everything a protocol layer needs to serve requests.
#[derive(Clone)]
pub struct GatewayContext {
    pub registry: Arc<EngineRegistry>,
    pub negotiation: NegotiationDefaults,
    pub heartbeat: Duration,
}

impl GatewayContext {
    /// Builds emitter, engines and registry from settings, in that order.
    ///
    /// The returned stream is the only consumer of lifecycle events.
    pub fn from_settings(settings: &Settings) -> Result<(Self, EventStream), ContextError> {
        let (emitter, events) = Emitter::channel(
            settings.insight.channel_capacity,
            settings.insight.include_trace,
        );

        let mut builder = EngineRegistry::builder()
            .pool(settings.pool.size, settings.pool.queue_depth)
            .timeout(settings.execution.timeout())
            .emitter(emitter.clone());
        for definition in &settings.engines {
            let engine: Arc<dyn Engine> = match definition {
                EngineSettings::Sql(sql) => {
                    Arc::new(SqlEngine::new(sql_config(sql, settings.execution.max_rows)))
                }
                EngineSettings::Sparql(sparql) => Arc::new(SparqlEngine::new(sparql_config(
                    sparql,
                    settings.execution.max_rows,
                ))?),
            };
            builder = builder.register(engine)?;
        }
        let registry = builder.build()?;

        let languages: Vec<String> = registry.languages().iter().map(|l| l.to_string()).collect();
        info!(
            target: LOG_TARGET,
            languages = ?languages,
            pool_size = settings.pool.size,
            queue_depth = settings.pool.queue_depth,
            timeout_ms = settings.execution.timeout_ms,
            "Gateway ready"
        );
        emitter.system().emit(
            EventDraft::system(Subject::Started).property("languages", languages.join(",")),
        );

        let context = Self {
            registry: Arc::new(registry),
            negotiation: NegotiationDefaults {
                acceptable: settings.negotiation.default_accept.clone(),
            },
            heartbeat: settings.insight.heartbeat(),
        };
        Ok((context, events))
    }
}

fn sql_config(settings: &SqlSettings, max_rows: usize) -> SqlEngineConfig {
    let mut config = SqlEngineConfig::new(&settings.database);
    if let Some(language) = &settings.language {
        config.language = language.clone();
    }
    if let Some(allow) = &settings.allow {
        config.whitelist = CommandWhitelist::allow_only(allow);
    }
    config.read_only = settings.read_only;
    config.max_rows = settings.max_rows.unwrap_or(max_rows);
    config
}

fn sparql_config(settings: &SparqlSettings, max_rows: usize) -> SparqlEngineConfig {
    let defaults = SparqlEngineConfig::default();
    SparqlEngineConfig {
        language: settings.language.clone().unwrap_or(defaults.language),
        dataset: settings.dataset.clone(),
        allow_federated: settings.allow_federated,
        allow_update: settings.allow_update,
        max_rows: settings.max_rows.unwrap_or(max_rows),
    }
}
