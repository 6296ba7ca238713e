use std::io::Write;
use std::sync::Arc;

use crate::command::{Command, Language};
use crate::engine::errors::GatewayError;
use crate::engine::lifecycle::{Lifecycle, State};
use crate::shared::media::MediaType;

/// A backend capability provider for one query language.
pub trait Engine: Send + Sync {
    fn language(&self) -> Language;

    /// Short backend name recorded on events, e.g. `sqlite`.
    fn name(&self) -> &str;

    /// Validates the command and selects its result writer.
    ///
    /// Runs on the submitting thread, so it must stay cheap: parse, check and
    /// negotiate, nothing more.
    fn prepare(&self, command: &Command) -> Result<Box<dyn Invocation>, GatewayError>;
}

/// Single-use execution handle for one command.
///
/// `execute`, `write` and `close` run on one worker thread. Cancellation from
/// other threads goes through [`CancelHandle`].
pub trait Invocation: Send {
    /// Media type the result will be written in.
    fn produces(&self) -> &MediaType;

    /// Runs the backend operation and keeps its result. Writes nothing.
    fn execute(&mut self) -> Result<(), GatewayError>;

    /// Serializes the kept result. Only valid after a successful `execute`.
    fn write(&mut self, sink: &mut dyn Write) -> Result<(), GatewayError>;

    fn cancel_handle(&self) -> CancelHandle;

    /// Best-effort abort. Idempotent and a no-op once execution finished.
    fn cancel(&self) -> bool {
        self.cancel_handle().cancel()
    }

    /// Releases every backend resource. Idempotent.
    fn close(&mut self);

    fn state(&self) -> State;
}

/// Backend hook that aborts a blocking call running on another thread.
pub trait Interrupt: Send + Sync {
    fn interrupt(&self);
}

/// Cloneable, thread-safe cancellation of one invocation.
#[derive(Clone)]
pub struct CancelHandle {
    lifecycle: Arc<Lifecycle>,
    interrupt: Arc<dyn Interrupt>,
}

impl CancelHandle {
    pub fn new(lifecycle: Arc<Lifecycle>, interrupt: Arc<dyn Interrupt>) -> Self {
        Self {
            lifecycle,
            interrupt,
        }
    }

    /// Returns true when this call cancelled the invocation.
    pub fn cancel(&self) -> bool {
        if self.lifecycle.cancel() {
            self.interrupt.interrupt();
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> State {
        self.lifecycle.state()
    }
}
