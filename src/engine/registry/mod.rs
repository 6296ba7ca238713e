pub mod errors;
pub mod pending;
pub mod pool;
pub mod registry;
pub mod result;

pub use errors::RegistryError;
pub use pending::{Pending, QueryFailure};
pub use pool::{Admission, Ticket, WorkerPool};
pub use registry::{EngineRegistry, EngineRegistryBuilder};
pub use result::ExecutionResult;

#[cfg(test)]
mod registry_test;
