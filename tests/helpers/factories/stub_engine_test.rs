use std::sync::atomic::Ordering;

use crate::engine::invocation::Engine;
use crate::engine::lifecycle::State;
use crate::test_helpers::factories::{CommandFactory, StubEngine};

#[test]
fn stub_invocation_writes_csv_rows() {
    let engine = StubEngine::new("sql").returning(&["a", "b"], &[&["1", "2"]]);
    let mut invocation = engine.prepare(&CommandFactory::sql().create()).unwrap();
    invocation.execute().unwrap();

    let mut out = Vec::new();
    invocation.write(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "a,b\r\n1,2\r\n");

    invocation.close();
    invocation.close();
    let counters = engine.counters();
    assert_eq!(counters.close_calls.load(Ordering::SeqCst), 2);
    assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    assert_eq!(invocation.state(), State::Closed);
}

#[test]
fn stub_rejects_syntax_errors_in_prepare() {
    let engine = StubEngine::new("sql");
    let err = engine
        .prepare(&CommandFactory::sql().with_text("syntax error").create())
        .err()
        .unwrap();
    assert_eq!(err.label(), "invalid_query");
}
