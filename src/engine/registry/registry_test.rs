use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::engine::errors::{FailureError, GatewayError, UsageError};
use crate::engine::registry::{EngineRegistry, RegistryError};
use crate::insight::Subject;
use crate::logging::init_for_tests;
use crate::shared::response::StatusCode;
use crate::test_helpers::factories::{CommandFactory, EventRecorder, StubCounters, StubEngine};

fn registry_with(engine: StubEngine, recorder: &EventRecorder) -> (EngineRegistry, Arc<StubCounters>) {
    let (engine, counters) = engine.into_shared();
    let registry = EngineRegistry::builder()
        .register(engine)
        .unwrap()
        .pool(2, 1)
        .timeout(Duration::from_millis(200))
        .emitter(recorder.emitter())
        .build()
        .unwrap();
    (registry, counters)
}

#[tokio::test]
async fn completed_query_writes_csv_and_emits_three_events() {
    init_for_tests();
    let mut recorder = EventRecorder::new(16);
    let (registry, counters) = registry_with(
        StubEngine::new("sql").returning(&["1"], &[&["1"]]),
        &recorder,
    );

    let command = CommandFactory::sql().with_text("SELECT 1").accepting(&["text/csv"]).create();
    let result = registry.submit(command).unwrap().await.unwrap();
    assert_eq!(result.media_type().to_string(), "text/csv");
    assert_eq!(result.status(), StatusCode::Ok);

    let mut out = Vec::new();
    result.write(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "1\r\n1\r\n");

    assert_eq!(
        recorder.subjects(),
        vec![Subject::Received, Subject::Executed, Subject::Completed]
    );
    assert_eq!(recorder.correlations().len(), 1);
    assert_eq!(StubCounters::get(&counters.executed), 1);
    assert_eq!(StubCounters::get(&counters.released), 1);
    assert_eq!(registry.pool().in_flight(), 0);
}

#[tokio::test]
async fn failing_execute_reports_failure_and_closes_once() {
    init_for_tests();
    let mut recorder = EventRecorder::new(16);
    let (registry, counters) = registry_with(
        StubEngine::new("sql").failing("no such table: missing"),
        &recorder,
    );

    let command = CommandFactory::sql().with_text("SELECT * FROM missing").create();
    let failure = registry.submit(command).unwrap().await.err().unwrap();

    assert!(matches!(
        failure.error(),
        GatewayError::Failure(FailureError::Backend { .. })
    ));
    assert_eq!(failure.status(), StatusCode::InternalError);
    assert_eq!(failure.report().cause(), "backend_failure");
    assert_eq!(recorder.count(Subject::Failed), 1);
    assert_eq!(recorder.count(Subject::Completed), 0);
    assert_eq!(StubCounters::get(&counters.close_calls), 1);
    assert_eq!(StubCounters::get(&counters.released), 1);
    assert_eq!(
        failure.report().correlation(),
        &recorder.correlations()[0]
    );
}

#[tokio::test]
async fn unsupported_language_never_touches_the_pool() {
    init_for_tests();
    let mut recorder = EventRecorder::new(16);
    let (registry, counters) = registry_with(StubEngine::new("sql"), &recorder);

    let command = CommandFactory::sql().with_language("not-a-language").create();
    let failure = registry.submit(command).err().unwrap();

    assert!(matches!(
        failure.error(),
        GatewayError::Usage(UsageError::LanguageNotSupported(tag)) if tag == "not-a-language"
    ));
    assert_eq!(failure.status(), StatusCode::NotFound);
    assert_eq!(StubCounters::get(&counters.prepared), 0);
    assert_eq!(registry.pool().in_flight(), 0);
    assert_eq!(recorder.subjects(), vec![Subject::Failed]);
}

#[tokio::test]
async fn usage_errors_fail_in_submit() {
    init_for_tests();
    let mut recorder = EventRecorder::new(16);
    let (registry, counters) = registry_with(StubEngine::new("sql"), &recorder);

    let invalid = CommandFactory::sql().with_text("syntax error").create();
    let failure = registry.submit(invalid).err().unwrap();
    assert_eq!(failure.error().label(), "invalid_query");

    let unacceptable = CommandFactory::sql().accepting(&["application/pdf"]).create();
    let failure = registry.submit(unacceptable).err().unwrap();
    assert_eq!(failure.status(), StatusCode::NotAcceptable);

    assert_eq!(StubCounters::get(&counters.executed), 0);
    assert_eq!(recorder.count(Subject::Failed), 2);
    assert_eq!(recorder.count(Subject::Received), 0);
}

#[tokio::test]
async fn timeout_cancels_blocked_execution() {
    init_for_tests();
    let mut recorder = EventRecorder::new(16);
    let (registry, counters) = registry_with(StubEngine::new("sql").blocking(), &recorder);

    let started = Instant::now();
    let failure = registry
        .submit(CommandFactory::sql().create())
        .unwrap()
        .await
        .err()
        .unwrap();
    let elapsed = started.elapsed();

    assert!(failure.error().is_timeout());
    assert_eq!(failure.status(), StatusCode::GatewayTimeout);
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(1200), "took {elapsed:?}");
    assert_eq!(StubCounters::get(&counters.cancelled), 1);

    StubCounters::wait_for(&counters.released, 1).await;
    assert_eq!(StubCounters::get(&counters.released), 1);
    assert_eq!(StubCounters::get(&counters.close_calls), 1);
    assert_eq!(recorder.count(Subject::Failed), 1);
    assert_eq!(recorder.count(Subject::Executed), 0);
}

#[tokio::test]
async fn saturation_fails_fast_with_backpressure() {
    init_for_tests();
    let recorder = EventRecorder::new(64);
    let (registry, counters) = registry_with(StubEngine::new("sql").blocking(), &recorder);

    let mut admitted = Vec::new();
    for _ in 0..registry.pool().capacity() {
        admitted.push(registry.submit(CommandFactory::sql().create()).unwrap());
    }

    let started = Instant::now();
    let failure = registry.submit(CommandFactory::sql().create()).err().unwrap();
    assert!(started.elapsed() < Duration::from_millis(50));
    assert!(matches!(
        failure.error(),
        GatewayError::Failure(FailureError::Backpressure { capacity: 3 })
    ));
    assert_eq!(failure.status(), StatusCode::ServiceUnavailable);

    // the rejected invocation was prepared, then closed without executing
    StubCounters::wait_for(&counters.released, 1).await;
    assert!(StubCounters::get(&counters.released) >= 1);

    for pending in &admitted {
        pending.cancel();
    }
    for pending in admitted {
        let failure = pending.await.err().unwrap();
        assert!(failure.error().is_cancelled());
    }
    StubCounters::wait_for(&counters.released, 4).await;
    assert_eq!(StubCounters::get(&counters.released), 4);
    assert_eq!(registry.pool().in_flight(), 0);
}

#[tokio::test]
async fn correlations_are_stable_per_submission() {
    init_for_tests();
    let mut recorder = EventRecorder::new(64);
    let (registry, _) = registry_with(StubEngine::new("sql"), &recorder);

    let first = registry.submit(CommandFactory::sql().create()).unwrap();
    let first_correlation = first.correlation().clone();
    first.await.unwrap().write(&mut Vec::new()).unwrap();

    let second = registry.submit(CommandFactory::sql().create()).unwrap();
    let second_correlation = second.correlation().clone();
    second.await.unwrap().write(&mut Vec::new()).unwrap();

    assert_ne!(first_correlation, second_correlation);
    let events = recorder.events().to_vec();
    assert_eq!(events.len(), 6);
    assert!(events[..3].iter().all(|e| e.correlation() == &first_correlation));
    assert!(events[3..].iter().all(|e| e.correlation() == &second_correlation));
}

#[tokio::test]
async fn dropping_pending_cancels_execution() {
    init_for_tests();
    let mut recorder = EventRecorder::new(16);
    let (registry, counters) = registry_with(StubEngine::new("sql").blocking(), &recorder);

    let pending = registry.submit(CommandFactory::sql().create()).unwrap();
    StubCounters::wait_for(&counters.executed, 1).await;
    drop(pending);

    StubCounters::wait_for(&counters.released, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(StubCounters::get(&counters.cancelled), 1);
    assert_eq!(StubCounters::get(&counters.released), 1);
    assert_eq!(recorder.count(Subject::Failed), 1);
}

#[tokio::test]
async fn unwritten_result_is_closed_and_reported() {
    init_for_tests();
    let mut recorder = EventRecorder::new(16);
    let (registry, counters) = registry_with(StubEngine::new("sql"), &recorder);

    let result = registry.submit(CommandFactory::sql().create()).unwrap().await.unwrap();
    drop(result);

    assert_eq!(StubCounters::get(&counters.written), 0);
    assert_eq!(StubCounters::get(&counters.released), 1);
    assert_eq!(
        recorder.subjects(),
        vec![Subject::Received, Subject::Executed, Subject::Failed]
    );
}

#[tokio::test]
async fn cancel_after_completion_is_a_no_op() {
    init_for_tests();
    let recorder = EventRecorder::new(16);
    let (registry, counters) = registry_with(StubEngine::new("sql"), &recorder);

    let pending = registry.submit(CommandFactory::sql().create()).unwrap();
    StubCounters::wait_for(&counters.executed, 1).await;
    let result = pending.await.unwrap();
    let mut out = Vec::new();
    result.write(&mut out).unwrap();
    assert!(!out.is_empty());
    assert_eq!(StubCounters::get(&counters.cancelled), 0);
}

#[test]
fn rejects_a_second_engine_for_a_language() {
    let (first, _) = StubEngine::new("sql").into_shared();
    let (second, _) = StubEngine::new("SQL").into_shared();
    let err = EngineRegistry::builder()
        .register(first)
        .unwrap()
        .register(second)
        .err()
        .unwrap();
    assert_eq!(err, RegistryError::DuplicateLanguage("sql".into()));
}

#[test]
fn rejects_an_empty_pool() {
    let err = EngineRegistry::builder().pool(0, 4).build().err().unwrap();
    assert_eq!(err, RegistryError::EmptyPool);
}

#[test]
fn lists_registered_languages() {
    let (sql, _) = StubEngine::new("sql").into_shared();
    let (sparql, _) = StubEngine::new("sparql").into_shared();
    let registry = EngineRegistry::builder()
        .register(sparql)
        .unwrap()
        .register(sql)
        .unwrap()
        .build()
        .unwrap();
    let languages: Vec<&str> = registry.languages().iter().map(|l| l.as_str()).collect();
    assert_eq!(languages, vec!["sparql", "sql"]);
}
