pub mod engine;
pub mod errors;
pub mod formats;
pub mod invocation;
pub mod syntax;

pub use engine::{SparqlEngine, SparqlEngineConfig};
pub use invocation::SparqlInvocation;
