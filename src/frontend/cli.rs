use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use crate::command::Command;
use crate::command::parser::{NegotiationDefaults, RequestParts, parse_request};
use crate::engine::errors::UsageError;
use crate::engine::registry::{EngineRegistry, QueryFailure};
use crate::shared::media::MediaType;

const LOG_TARGET: &str = "frontend::cli";

#[derive(Debug, Parser)]
#[command(name = "snel_gateway")]
#[command(about = "Runs one query or update through the gateway", long_about = None)]
pub struct Cli {
    /// Settings file, defaults to $GATEWAY_CONFIG or config/gateway
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Language of a registered engine, e.g. sql or sparql
    pub language: String,

    /// Send TEXT as an update instead of a query
    #[arg(long)]
    pub update: bool,

    /// Acceptable media types, most preferred first
    #[arg(short, long = "accept", value_name = "TYPE")]
    pub accept: Vec<String>,

    /// Named parameters as NAME=VALUE
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    pub text: String,
}

impl Cli {
    /// Turns the arguments into a command the way a protocol layer would.
    pub fn to_command(&self, defaults: &NegotiationDefaults) -> Result<Command, UsageError> {
        let field = if self.update { "update" } else { "query" };
        let mut query = vec![(field.to_string(), self.text.clone())];
        for param in &self.params {
            let (name, value) = param.split_once('=').ok_or_else(|| {
                UsageError::IllegalCommand(format!("parameter {param} is not NAME=VALUE"))
            })?;
            query.push((name.to_string(), value.to_string()));
        }

        let accept = (!self.accept.is_empty()).then(|| self.accept.join(", "));

        parse_request(
            RequestParts {
                language: self.language.clone(),
                query,
                accept,
                ..RequestParts::default()
            },
            defaults,
        )
    }
}

/// Submits one command and streams its result into `out`.
pub async fn run_once(
    registry: &EngineRegistry,
    command: Command,
    out: &mut dyn Write,
) -> Result<MediaType, QueryFailure> {
    let result = registry.submit(command)?.await?;
    let media_type = result.media_type().clone();
    debug!(target: LOG_TARGET, correlation = %result.correlation(), %media_type, "Writing result");
    result.write(out)?;
    Ok(media_type)
}
