pub mod parser;
pub mod types;

pub use types::{Command, CommandBuilder, Identity, Language, Operation};
