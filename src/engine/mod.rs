pub(crate) mod cursor;
pub mod errors;
pub mod invocation;
pub mod lifecycle;
pub mod registry;
pub mod sparql;
pub mod sql;

pub use errors::*;
pub use invocation::{CancelHandle, Engine, Interrupt, Invocation};
pub use lifecycle::{Lifecycle, State};
pub use registry::{EngineRegistry, ExecutionResult, Pending, QueryFailure};

#[cfg(test)]
mod cursor_test;
