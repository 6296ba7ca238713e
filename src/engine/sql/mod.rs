pub mod engine;
pub mod errors;
pub mod invocation;
pub mod values;
pub mod whitelist;
pub mod writers;

pub use engine::{SqlEngine, SqlEngineConfig};
pub use invocation::SqlInvocation;
pub use whitelist::CommandWhitelist;

#[cfg(test)]
mod values_test;
