pub mod model;

pub use model::{
    EngineSettings, ExecutionConfig, InsightConfig, LoggingConfig, NegotiationConfig, PoolConfig,
    Settings, SparqlSettings, SqlSettings, load_settings,
};
