use std::io;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::shared::response::StatusCode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Root error of every gateway operation.
///
/// `Usage` is the client's fault and never consumes a worker slot beyond
/// `prepare()`. `Failure` is a system or backend fault.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Failure(#[from] FailureError),
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("language <{0}> is not supported")]
    LanguageNotSupported(String),

    #[error("invalid query: {message}")]
    InvalidQuery {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("no supported media type in {accepted} - expected one of {registered}")]
    NoMatchingFormat { accepted: String, registered: String },

    #[error("illegal command: {0}")]
    IllegalCommand(String),

    #[error("command rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum FailureError {
    #[error("backend execution failed: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("worker pool saturated ({capacity} submissions in flight)")]
    Backpressure { capacity: usize },

    #[error("result exceeds the limit of {limit} rows")]
    ResourceExhausted { limit: usize },

    #[error("query timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("query cancelled")]
    Cancelled,

    #[error("writing results failed: {0}")]
    Write(#[from] io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl UsageError {
    pub fn invalid_query(message: impl ToString) -> Self {
        UsageError::InvalidQuery {
            message: message.to_string(),
            source: None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UsageError::LanguageNotSupported(_) => "language_not_supported",
            UsageError::InvalidQuery { .. } => "invalid_query",
            UsageError::NoMatchingFormat { .. } => "no_matching_format",
            UsageError::IllegalCommand(_) => "illegal_command",
            UsageError::Rejected(_) => "rejected",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            UsageError::LanguageNotSupported(_) => StatusCode::NotFound,
            UsageError::NoMatchingFormat { .. } => StatusCode::NotAcceptable,
            UsageError::Rejected(_) => StatusCode::Forbidden,
            UsageError::InvalidQuery { .. } | UsageError::IllegalCommand(_) => {
                StatusCode::BadRequest
            }
        }
    }
}

impl FailureError {
    pub fn backend(message: impl ToString) -> Self {
        FailureError::Backend {
            message: message.to_string(),
            source: None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FailureError::Backend { .. } => "backend_failure",
            FailureError::Backpressure { .. } => "backpressure",
            FailureError::ResourceExhausted { .. } => "resource_exhausted",
            FailureError::Timeout(_) => "timeout",
            FailureError::Cancelled => "cancelled",
            FailureError::Write(_) => "write_failure",
            FailureError::Internal(_) => "internal",
        }
    }

    /// Client-facing text. Backend, io and internal detail stays in logs.
    pub fn public_message(&self) -> String {
        match self {
            FailureError::Backend { .. } => "backend execution failed".into(),
            FailureError::Write(_) => "failed to write the result".into(),
            FailureError::Internal(_) => "internal gateway error".into(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FailureError::Backpressure { .. } => StatusCode::ServiceUnavailable,
            FailureError::Timeout(_) => StatusCode::GatewayTimeout,
            _ => StatusCode::InternalError,
        }
    }
}

impl GatewayError {
    pub fn is_usage(&self) -> bool {
        matches!(self, GatewayError::Usage(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Failure(FailureError::Timeout(_)))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Failure(FailureError::Cancelled))
    }

    /// Short, stable label safe to expose to clients and event consumers.
    pub fn label(&self) -> &'static str {
        match self {
            GatewayError::Usage(e) => e.label(),
            GatewayError::Failure(e) => e.label(),
        }
    }

    /// Usage errors describe the client's own request, so they keep their text.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Usage(e) => e.to_string(),
            GatewayError::Failure(e) => e.public_message(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Usage(e) => e.status(),
            GatewayError::Failure(e) => e.status(),
        }
    }

    pub fn log_error(&self) {
        match self {
            GatewayError::Usage(e) => {
                debug!(target: "engine::errors", label = e.label(), "Rejected command: {}", e);
            }
            GatewayError::Failure(FailureError::Timeout(after)) => {
                warn!(target: "engine::errors", timeout_ms = after.as_millis() as u64, "Query timed out");
            }
            GatewayError::Failure(FailureError::Cancelled) => {
                warn!(target: "engine::errors", "Query cancelled");
            }
            GatewayError::Failure(e) => {
                error!(target: "engine::errors", label = e.label(), "Query failed: {}", e);
                debug!(target: "engine::errors", "Failure details: {:?}", e);
            }
        }
    }
}
