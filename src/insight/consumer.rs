use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::insight::emitter::{EventStream, Signal};
use crate::insight::event::{Event, Subject};

const LOG_TARGET: &str = "gateway::insight";

/// Drains the event stream into the log until every emitter is dropped.
///
/// Idle periods longer than `heartbeat` are marked with a trace line.
pub fn spawn_log_consumer(mut stream: EventStream, heartbeat: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = stream.next_signal(heartbeat).await {
            match signal {
                Signal::Event(event) => log_event(&event),
                Signal::Heartbeat => trace!(target: LOG_TARGET, "No events"),
            }
        }
        info!(target: LOG_TARGET, "Event consumer stopped");
    })
}

fn log_event(event: &Event) {
    let properties = serde_json::to_string(event.properties()).unwrap_or_default();
    match event.subject() {
        Subject::Failed => warn!(
            target: LOG_TARGET,
            correlation = %event.correlation(),
            subject = %event.subject(),
            %properties,
            "Request event"
        ),
        _ => info!(
            target: LOG_TARGET,
            correlation = %event.correlation(),
            subject = %event.subject(),
            %properties,
            "Request event"
        ),
    }
}
