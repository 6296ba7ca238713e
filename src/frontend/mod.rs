pub mod cli;
pub mod context;

pub use cli::{Cli, run_once};
pub use context::{ContextError, GatewayContext};
