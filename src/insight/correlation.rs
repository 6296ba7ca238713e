use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SYSTEM_URN: &str = "urn:snel-gateway:system-correlation";

/// Opaque token linking all events of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Correlation(String);

impl Correlation {
    /// A fresh, random correlation for a new request.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The fixed correlation of events raised outside any request.
    pub fn system() -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, SYSTEM_URN.as_bytes()).to_string())
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
