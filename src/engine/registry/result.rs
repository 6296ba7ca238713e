use std::io::Write;

use tracing::{debug, warn};

use crate::engine::errors::{FailureError, GatewayError};
use crate::engine::invocation::Invocation;
use crate::engine::registry::pending::QueryFailure;
use crate::insight::{Correlation, EventDraft, ScopedEmitter, Subject};
use crate::shared::media::MediaType;
use crate::shared::response::StatusCode;

const LOG_TARGET: &str = "gateway::registry";

/// Owns an invocation and closes it exactly once, on every exit path.
pub(crate) struct CloseGuard {
    invocation: Box<dyn Invocation>,
}

impl CloseGuard {
    pub(crate) fn new(invocation: Box<dyn Invocation>) -> Self {
        Self { invocation }
    }

    pub(crate) fn invocation(&mut self) -> &mut dyn Invocation {
        self.invocation.as_mut()
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        debug!(target: LOG_TARGET, state = %self.invocation.state(), "Releasing invocation");
        self.invocation.close();
    }
}

/// A completed execution whose result is ready to be written once.
///
/// Dropping it unwritten closes the invocation and reports the request as
/// cancelled.
pub struct ExecutionResult {
    guard: Option<CloseGuard>,
    media_type: MediaType,
    scope: ScopedEmitter,
}

impl ExecutionResult {
    pub(crate) fn new(guard: CloseGuard, media_type: MediaType, scope: ScopedEmitter) -> Self {
        Self {
            guard: Some(guard),
            media_type,
            scope,
        }
    }

    /// Content type negotiated for the response body.
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::Ok
    }

    pub fn correlation(&self) -> &Correlation {
        self.scope.correlation()
    }

    /// Streams the result into `sink`, then closes the invocation.
    pub fn write(mut self, sink: &mut dyn Write) -> Result<(), QueryFailure> {
        let outcome = match self.guard.take() {
            Some(mut guard) => {
                let outcome = guard
                    .invocation()
                    .write(sink)
                    .and_then(|_| sink.flush().map_err(|e| FailureError::Write(e).into()));
                drop(guard);
                outcome
            }
            None => Err(FailureError::Internal("result already consumed".into()).into()),
        };
        match outcome {
            Ok(()) => {
                self.scope.emit(
                    EventDraft::request(Subject::Completed)
                        .property("format", self.media_type.to_string()),
                );
                Ok(())
            }
            Err(error) => Err(fail(&self.scope, error)),
        }
    }
}

impl Drop for ExecutionResult {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            warn!(
                target: LOG_TARGET,
                correlation = %self.scope.correlation(),
                "Result discarded before it was written"
            );
            drop(guard);
            self.scope.fail(&FailureError::Cancelled.into());
        }
    }
}

pub(crate) fn fail(scope: &ScopedEmitter, error: GatewayError) -> QueryFailure {
    error.log_error();
    let report = scope.fail(&error);
    QueryFailure::new(error, report)
}
