use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

use crate::engine::errors::GatewayError;
use crate::insight::correlation::Correlation;
use crate::insight::error_report::ErrorReport;
use crate::insight::event::{Event, EventDraft, Subject};

const LOG_TARGET: &str = "gateway::insight";

/// Publishes lifecycle events to a single decoupled consumer.
///
/// Publishing never blocks and never fails: when the buffer is full or no
/// consumer is attached, the event is dropped and counted.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<EmitterInner>,
}

struct EmitterInner {
    tx: mpsc::Sender<Event>,
    dropped: AtomicU64,
    include_trace: bool,
}

impl Emitter {
    pub fn channel(capacity: usize, include_trace: bool) -> (Emitter, EventStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let emitter = Emitter {
            inner: Arc::new(EmitterInner {
                tx,
                dropped: AtomicU64::new(0),
                include_trace,
            }),
        };
        (emitter, EventStream { rx })
    }

    /// An emitter without a consumer; every event is dropped and counted.
    pub fn detached(include_trace: bool) -> Emitter {
        let (emitter, _) = Self::channel(1, include_trace);
        emitter
    }

    pub fn scoped(&self, correlation: Correlation) -> ScopedEmitter {
        ScopedEmitter {
            emitter: self.clone(),
            correlation,
        }
    }

    pub fn system(&self) -> ScopedEmitter {
        self.scoped(Correlation::system())
    }

    /// Number of events lost so far.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    fn publish(&self, event: Event) {
        match self.inner.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) | Err(TrySendError::Closed(event)) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(target: LOG_TARGET, correlation = %event.correlation(), subject = %event.subject(), "Dropped event");
            }
        }
    }
}

/// An emitter bound to the correlation of one request.
#[derive(Clone)]
pub struct ScopedEmitter {
    emitter: Emitter,
    correlation: Correlation,
}

impl ScopedEmitter {
    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    /// Attaches correlation and wall-clock time, then publishes.
    pub fn emit(&self, draft: EventDraft) -> Event {
        let event = Event::new(self.correlation.clone(), Utc::now(), draft);
        self.emitter.publish(event.clone());
        event
    }

    /// Publishes a `failed` event for the error and renders its client payload.
    ///
    /// The event only carries the short label of system failures; messages of
    /// usage errors are included since they describe the client's input.
    pub fn fail(&self, error: &GatewayError) -> ErrorReport {
        let timestamp = Utc::now();
        let report = ErrorReport::from_error(
            error,
            self.correlation.clone(),
            timestamp,
            self.emitter.inner.include_trace,
        );
        let mut draft = EventDraft::request(Subject::Failed)
            .property("label", error.label())
            .property("status", error.status().code().to_string());
        if error.is_usage() {
            draft = draft.property("message", error.to_string());
        }
        self.emitter
            .publish(Event::new(self.correlation.clone(), timestamp, draft));
        report
    }
}

/// What a push-style bridge receives from [`EventStream::next_signal`].
#[derive(Debug, Clone)]
pub enum Signal {
    Event(Event),
    Heartbeat,
}

/// The single consumer side of an [`Emitter`].
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    /// Next event, or `None` once every emitter is gone.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Next event, or a heartbeat marker if none arrives within `idle`.
    pub async fn next_signal(&mut self, idle: Duration) -> Option<Signal> {
        match tokio::time::timeout(idle, self.rx.recv()).await {
            Ok(Some(event)) => Some(Signal::Event(event)),
            Ok(None) => None,
            Err(_) => Some(Signal::Heartbeat),
        }
    }

    pub fn try_next(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}
