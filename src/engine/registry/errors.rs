use thiserror::Error;

/// Startup wiring faults of the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("an engine for language <{0}> is already registered")]
    DuplicateLanguage(String),

    #[error("worker pool size must be at least 1")]
    EmptyPool,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}
