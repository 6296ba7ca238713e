use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use snel_gateway::frontend::{Cli, GatewayContext, run_once};
use snel_gateway::insight::{EventDraft, Subject, spawn_log_consumer};
use snel_gateway::logging;
use snel_gateway::shared::config::load_settings;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    logging::init(&settings.logging)?;

    let (context, events) = GatewayContext::from_settings(&settings)?;
    let consumer = spawn_log_consumer(events, context.heartbeat);

    let exit = match cli.to_command(&context.negotiation) {
        Ok(command) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let outcome = run_once(&context.registry, command, &mut out).await;
            out.flush()?;
            match outcome {
                Ok(media_type) => {
                    info!(%media_type, "Request completed");
                    ExitCode::SUCCESS
                }
                Err(failure) => {
                    eprintln!("{}", failure.report().to_json());
                    ExitCode::FAILURE
                }
            }
        }
        Err(usage) => {
            eprintln!("{usage}");
            ExitCode::from(2)
        }
    };

    context
        .registry
        .emitter()
        .system()
        .emit(EventDraft::system(Subject::Stopped));
    drop(context);
    consumer.await?;
    Ok(exit)
}
