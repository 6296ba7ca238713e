pub mod consumer;
pub mod correlation;
pub mod emitter;
pub mod error_report;
pub mod event;

pub use consumer::spawn_log_consumer;
pub use correlation::Correlation;
pub use emitter::{Emitter, EventStream, ScopedEmitter, Signal};
pub use error_report::ErrorReport;
pub use event::{Event, EventDraft, Scope, Subject};

#[cfg(test)]
mod emitter_test;
