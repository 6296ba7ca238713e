use std::error::Error as StdError;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::errors::GatewayError;
use crate::insight::correlation::Correlation;
use crate::shared::response::StatusCode;

/// Client-facing description of a failed request, rendered as
/// `application/vnd.error+json`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    message: String,
    cause: String,
    logref: Correlation,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chain: Vec<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl ErrorReport {
    /// Failure detail and the cause chain are only included when
    /// `include_trace` is set, i.e. in non-production deployments.
    pub fn from_error(
        error: &GatewayError,
        correlation: Correlation,
        timestamp: DateTime<Utc>,
        include_trace: bool,
    ) -> Self {
        let chain = if include_trace {
            cause_chain(error)
        } else {
            Vec::new()
        };
        Self {
            message: error.public_message(),
            cause: error.label().to_string(),
            logref: correlation,
            timestamp,
            chain,
            status: error.status(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }

    pub fn correlation(&self) -> &Correlation {
        &self.logref
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"message":"failed to render error","logref":"{}"}}"#, self.logref)
        })
    }
}

fn cause_chain(error: &GatewayError) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut current: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}
