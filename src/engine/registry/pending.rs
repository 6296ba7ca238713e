use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::engine::errors::{FailureError, GatewayError};
use crate::engine::invocation::CancelHandle;
use crate::engine::registry::result::{ExecutionResult, fail};
use crate::insight::{Correlation, ErrorReport, ScopedEmitter};
use crate::shared::response::StatusCode;

/// A failed submission: the error and the client payload rendered for it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct QueryFailure {
    #[source]
    error: GatewayError,
    report: ErrorReport,
}

impl QueryFailure {
    pub(crate) fn new(error: GatewayError, report: ErrorReport) -> Self {
        Self { error, report }
    }

    pub fn error(&self) -> &GatewayError {
        &self.error
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }

    pub fn status(&self) -> StatusCode {
        self.error.status()
    }

    pub fn into_error(self) -> GatewayError {
        self.error
    }
}

pub(crate) type Outcome = Result<ExecutionResult, QueryFailure>;

/// Future of a submitted command.
///
/// Dropping it before it resolves counts as a client disconnect and cancels
/// the execution.
pub struct Pending {
    rx: oneshot::Receiver<Outcome>,
    cancel: CancelHandle,
    scope: ScopedEmitter,
}

impl Pending {
    pub(crate) fn new(rx: oneshot::Receiver<Outcome>, cancel: CancelHandle, scope: ScopedEmitter) -> Self {
        Self { rx, cancel, scope }
    }

    pub fn correlation(&self) -> &Correlation {
        self.scope.correlation()
    }

    /// Requests cancellation; the future then resolves with `Cancelled` unless
    /// execution already finished.
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }
}

impl Future for Pending {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(fail(
                &self.scope,
                FailureError::Internal("execution supervisor vanished".into()).into(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}
