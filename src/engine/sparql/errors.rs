use std::error::Error;

use oxigraph::sparql::QueryEvaluationError;

use crate::engine::errors::{FailureError, GatewayError, UsageError};

/// Parse failures are the client's fault.
pub fn syntax<E>(error: E) -> GatewayError
where
    E: Error + Send + Sync + 'static,
{
    UsageError::InvalidQuery {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
    .into()
}

/// Evaluation, storage and loading failures are backend faults.
pub fn backend<E>(error: E) -> GatewayError
where
    E: Error + Send + Sync + 'static,
{
    FailureError::Backend {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
    .into()
}

/// Like [`backend`], except that a tripped cancellation token reads as cancellation.
pub fn evaluation(error: QueryEvaluationError) -> GatewayError {
    match error {
        QueryEvaluationError::Cancelled => FailureError::Cancelled.into(),
        other => backend(other),
    }
}
