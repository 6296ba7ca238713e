use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::cursor::Cursor;
use crate::engine::errors::{FailureError, GatewayError};

type Numbers = Cursor<&'static str, u32, usize>;

fn counting(rows: u32) -> Numbers {
    Cursor::spawn("test-cursor", move |feed| {
        feed.header("n");
        let mut sent = 0;
        for n in 0..rows {
            if !feed.row(n) {
                break;
            }
            sent += 1;
        }
        sent
    })
    .unwrap()
}

#[test]
fn reads_header_then_rows_in_order() {
    let mut cursor = counting(3);
    assert_eq!(cursor.header().unwrap(), "n");

    let mut seen = Vec::new();
    while let Some(row) = cursor.next_row() {
        seen.push(row.unwrap());
    }
    assert_eq!(seen, vec![0, 1, 2]);
    assert!(cursor.next_row().is_none());
    assert_eq!(cursor.close(), Some(3));
}

#[test]
fn failure_before_the_first_row_surfaces_from_header() {
    let mut cursor: Numbers = Cursor::spawn("test-cursor", |feed| {
        feed.header("n");
        feed.fail(FailureError::Cancelled.into());
        0
    })
    .unwrap();
    assert!(cursor.header().unwrap_err().is_cancelled());
    assert_eq!(cursor.close(), Some(0));
}

#[test]
fn collect_stops_at_the_limit() {
    let mut cursor = counting(10);
    cursor.header().unwrap();
    let err = cursor.collect(4).unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Failure(FailureError::ResourceExhausted { limit: 4 })
    ));
    cursor.close();

    let mut cursor = counting(4);
    cursor.header().unwrap();
    assert_eq!(cursor.collect(4).unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn close_releases_a_producer_waiting_on_a_full_buffer() {
    let produced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&produced);
    let mut cursor: Numbers = Cursor::spawn("test-cursor", move |feed| {
        feed.header("n");
        let mut n = 0;
        while feed.row(n) {
            counter.fetch_add(1, Ordering::SeqCst);
            n += 1;
        }
        n as usize
    })
    .unwrap();
    cursor.header().unwrap();
    assert_eq!(cursor.next_row().unwrap().unwrap(), 0);

    let sent = cursor.close().unwrap();
    assert!(sent < 1_000);
    assert_eq!(sent, produced.load(Ordering::SeqCst));
}

#[test]
fn panicking_producer_reads_as_internal_failure() {
    let mut cursor: Numbers = Cursor::spawn("test-cursor", |feed| {
        feed.header("n");
        panic!("boom");
    })
    .unwrap();
    let err = cursor.header().unwrap_err();
    assert!(matches!(err, GatewayError::Failure(FailureError::Internal(_))));
    assert_eq!(cursor.close(), None);
}
