use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::insight::correlation::Correlation;

/// Names an event's own attributes; free-form properties never overwrite them.
pub const RESERVED_PROPERTIES: [&str; 5] = ["type", "scope", "subject", "correlation", "timestamp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Request,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Received,
    Executed,
    Completed,
    Failed,
    Started,
    Stopped,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Received => "received",
            Subject::Executed => "executed",
            Subject::Completed => "completed",
            Subject::Failed => "failed",
            Subject::Started => "started",
            Subject::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable lifecycle record. Only an emitter creates these.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    correlation: Correlation,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    scope: Scope,
    subject: Subject,
    properties: IndexMap<String, String>,
}

impl Event {
    pub(crate) fn new(correlation: Correlation, timestamp: DateTime<Utc>, draft: EventDraft) -> Self {
        Self {
            correlation,
            timestamp,
            scope: draft.scope,
            subject: draft.subject,
            properties: draft.properties,
        }
    }

    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }
}

/// An event before correlation and timestamp are attached.
#[derive(Debug, Clone)]
pub struct EventDraft {
    scope: Scope,
    subject: Subject,
    properties: IndexMap<String, String>,
}

impl EventDraft {
    pub fn request(subject: Subject) -> Self {
        Self {
            scope: Scope::Request,
            subject,
            properties: IndexMap::new(),
        }
    }

    pub fn system(subject: Subject) -> Self {
        Self {
            scope: Scope::System,
            subject,
            properties: IndexMap::new(),
        }
    }

    /// Adds a property unless its name is reserved or already present.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if !RESERVED_PROPERTIES.contains(&name.as_str()) {
            self.properties.entry(name).or_insert_with(|| value.into());
        }
        self
    }

    pub fn properties<'a>(mut self, all: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (name, value) in all {
            self = self.property(name.clone(), value.clone());
        }
        self
    }
}
