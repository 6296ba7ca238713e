use rusqlite::ErrorCode;

use crate::engine::errors::{FailureError, GatewayError, UsageError};

/// Where a backend error surfaced; compile errors are the client's fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Open,
    Compile,
    Execute,
}

/// Maps a rusqlite error onto the gateway taxonomy.
///
/// | condition                              | kind                 |
/// |----------------------------------------|----------------------|
/// | interrupted                            | `Cancelled`          |
/// | read-only or authorization denied      | `Rejected`           |
/// | constraint or datatype violation       | `InvalidQuery`       |
/// | malformed input or compile failure     | `InvalidQuery`       |
/// | bad parameter or multiple statements   | `InvalidQuery`       |
/// | anything else                          | `Backend`            |
pub fn translate(error: rusqlite::Error, phase: Phase) -> GatewayError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::OperationInterrupted => FailureError::Cancelled.into(),
            ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied
            | ErrorCode::AuthorizationForStatementDenied => {
                UsageError::Rejected(error.to_string()).into()
            }
            ErrorCode::ConstraintViolation | ErrorCode::TypeMismatch => invalid(error),
            ErrorCode::Unknown if phase == Phase::Compile => invalid(error),
            _ => backend(error),
        },
        rusqlite::Error::SqlInputError { .. } => invalid(error),
        rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::InvalidParameterCount(_, _)
        | rusqlite::Error::MultipleStatement => invalid(error),
        _ => backend(error),
    }
}

fn invalid(error: rusqlite::Error) -> GatewayError {
    UsageError::InvalidQuery {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
    .into()
}

fn backend(error: rusqlite::Error) -> GatewayError {
    FailureError::Backend {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
    .into()
}
