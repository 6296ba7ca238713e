use std::fmt;

use parking_lot::Mutex;
use tracing::trace;

use crate::engine::errors::{FailureError, GatewayError};

const LOG_TARGET: &str = "engine::lifecycle";

/// States of one invocation.
///
/// `Created → Prepared → Executing → {Completed, Failed, Cancelled} → Closed`.
/// `Cancelled` is also reachable from `Created` and `Prepared`, and any state
/// may move to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    Prepared,
    Executing,
    Completed,
    Failed,
    Cancelled,
    Closed,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Completed | State::Failed | State::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Created => "created",
            State::Prepared => "prepared",
            State::Executing => "executing",
            State::Completed => "completed",
            State::Failed => "failed",
            State::Cancelled => "cancelled",
            State::Closed => "closed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Inner {
    state: State,
    executed: bool,
    written: bool,
}

/// Thread-safe state machine shared by an invocation and its cancel handles.
///
/// Misuse of the contract (a second `execute`, `write` before completion)
/// is a programming fault and panics.
#[derive(Debug)]
pub struct Lifecycle {
    inner: Mutex<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State::Created,
                executed: false,
                written: false,
            }),
        }
    }

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    /// Marks validation as done. Only valid once, from `Created`.
    pub fn prepared(&self) {
        let mut inner = self.inner.lock();
        assert_eq!(
            inner.state,
            State::Created,
            "invocation prepared in state {}",
            inner.state
        );
        inner.state = State::Prepared;
    }

    /// Enters `Executing`.
    ///
    /// Fails with `Cancelled` when a cancel arrived first. Panics when called
    /// a second time or after close.
    pub fn begin_execute(&self) -> Result<(), GatewayError> {
        let mut inner = self.inner.lock();
        if inner.executed {
            panic!("invocation executed twice");
        }
        inner.executed = true;
        match inner.state {
            State::Prepared => {
                inner.state = State::Executing;
                Ok(())
            }
            State::Cancelled => Err(FailureError::Cancelled.into()),
            other => panic!("invocation executed in state {other}"),
        }
    }

    /// Records the outcome of the backend call.
    ///
    /// A cancel that raced with the backend wins: the outcome is discarded and
    /// `Cancelled` is reported instead.
    pub fn finish_execute<T>(&self, outcome: Result<T, GatewayError>) -> Result<T, GatewayError> {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Executing => match outcome {
                Ok(value) => {
                    inner.state = State::Completed;
                    Ok(value)
                }
                Err(error) => {
                    inner.state = State::Failed;
                    Err(error)
                }
            },
            State::Cancelled => Err(FailureError::Cancelled.into()),
            other => panic!("invocation finished execution in state {other}"),
        }
    }

    /// Moves to `Cancelled` unless a terminal state was already reached.
    ///
    /// Returns true when this call performed the transition.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Created | State::Prepared | State::Executing => {
                trace!(target: LOG_TARGET, from = %inner.state, "Cancelling invocation");
                inner.state = State::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Checks that results may be written now. Panics otherwise.
    pub fn begin_write(&self) {
        let mut inner = self.inner.lock();
        if inner.state != State::Completed {
            panic!("invocation written in state {}", inner.state);
        }
        if inner.written {
            panic!("invocation written twice");
        }
        inner.written = true;
    }

    /// Returns true only for the call that performed the transition to `Closed`.
    pub fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == State::Closed {
            return false;
        }
        trace!(target: LOG_TARGET, from = %inner.state, "Closing invocation");
        inner.state = State::Closed;
        true
    }
}
