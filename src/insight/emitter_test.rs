use std::time::Duration;

use crate::engine::errors::{FailureError, GatewayError, UsageError};
use crate::insight::{Correlation, Emitter, EventDraft, Scope, Signal, Subject};

#[test]
fn correlations_are_unique_and_system_is_stable() {
    assert_ne!(Correlation::generate(), Correlation::generate());
    assert_eq!(Correlation::system(), Correlation::system());
}

#[test]
fn scoped_emitter_attaches_correlation() {
    let (emitter, mut stream) = Emitter::channel(8, false);
    let correlation = Correlation::generate();
    let scoped = emitter.scoped(correlation.clone());

    scoped.emit(EventDraft::request(Subject::Received).property("language", "sql"));
    scoped.emit(EventDraft::request(Subject::Executed));

    let first = stream.try_next().unwrap();
    let second = stream.try_next().unwrap();
    assert_eq!(first.correlation(), &correlation);
    assert_eq!(second.correlation(), &correlation);
    assert_eq!(first.subject(), Subject::Received);
    assert_eq!(second.subject(), Subject::Executed);
    assert_eq!(first.scope(), Scope::Request);
    assert_eq!(first.properties()["language"], "sql");
    assert!(first.timestamp() <= second.timestamp());
}

#[test]
fn reserved_properties_are_never_overwritten() {
    let draft = EventDraft::request(Subject::Received)
        .property("correlation", "forged")
        .property("subject", "forged")
        .property("engine", "sqlite")
        .property("engine", "ignored");
    let (emitter, mut stream) = Emitter::channel(1, false);
    emitter.system().emit(draft);
    let event = stream.try_next().unwrap();
    assert_eq!(event.properties().len(), 1);
    assert_eq!(event.properties()["engine"], "sqlite");
    assert_eq!(event.correlation(), &Correlation::system());
}

#[test]
fn full_buffer_drops_and_counts_without_blocking() {
    let (emitter, mut stream) = Emitter::channel(1, false);
    let scoped = emitter.system();
    scoped.emit(EventDraft::system(Subject::Started));
    scoped.emit(EventDraft::system(Subject::Stopped));
    assert_eq!(emitter.dropped(), 1);
    assert_eq!(stream.try_next().unwrap().subject(), Subject::Started);
    assert!(stream.try_next().is_none());
}

#[test]
fn detached_emitter_counts_every_event() {
    let emitter = Emitter::detached(false);
    emitter.system().emit(EventDraft::system(Subject::Started));
    emitter.system().emit(EventDraft::system(Subject::Stopped));
    assert_eq!(emitter.dropped(), 2);
}

#[test]
fn fail_emits_redacted_failed_event() {
    let (emitter, mut stream) = Emitter::channel(4, false);
    let scoped = emitter.scoped(Correlation::generate());

    let failure = GatewayError::from(FailureError::backend("disk on fire at /var/db"));
    let report = scoped.fail(&failure);
    let event = stream.try_next().unwrap();
    assert_eq!(event.subject(), Subject::Failed);
    assert_eq!(event.properties()["label"], "backend_failure");
    assert_eq!(event.properties()["status"], "500");
    assert!(!event.properties().contains_key("message"));
    assert_eq!(report.correlation(), scoped.correlation());

    let usage = GatewayError::from(UsageError::LanguageNotSupported("cobol".into()));
    scoped.fail(&usage);
    let event = stream.try_next().unwrap();
    assert!(event.properties()["message"].contains("cobol"));
}

#[tokio::test]
async fn next_signal_yields_heartbeat_when_idle() {
    let (emitter, mut stream) = Emitter::channel(4, false);
    let signal = stream.next_signal(Duration::from_millis(10)).await;
    assert!(matches!(signal, Some(Signal::Heartbeat)));

    emitter.system().emit(EventDraft::system(Subject::Started));
    let signal = stream.next_signal(Duration::from_millis(10)).await;
    assert!(matches!(signal, Some(Signal::Event(_))));

    drop(emitter);
    assert!(stream.next_signal(Duration::from_millis(10)).await.is_none());
}
