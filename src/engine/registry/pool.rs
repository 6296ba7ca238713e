use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::engine::errors::FailureError;

const LOG_TARGET: &str = "gateway::pool";

/// Bounded execution capacity shared by every engine.
///
/// `size` commands execute concurrently and at most `queue_depth` more wait
/// for a slot. Admission beyond that fails fast.
#[derive(Clone)]
pub struct WorkerPool {
    admission: Arc<Semaphore>,
    slots: Arc<Semaphore>,
    size: usize,
    queue_depth: usize,
}

impl WorkerPool {
    pub fn new(size: usize, queue_depth: usize) -> Self {
        Self {
            admission: Arc::new(Semaphore::new(size + queue_depth)),
            slots: Arc::new(Semaphore::new(size)),
            size,
            queue_depth,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    pub fn capacity(&self) -> usize {
        self.size + self.queue_depth
    }

    /// Submissions admitted and not yet finished, waiting ones included.
    pub fn in_flight(&self) -> usize {
        self.capacity() - self.admission.available_permits()
    }

    /// Submissions currently holding an execution slot.
    pub fn executing(&self) -> usize {
        self.size - self.slots.available_permits()
    }

    /// Reserves a place in the pool without waiting.
    pub fn admit(&self) -> Result<Admission, FailureError> {
        match Arc::clone(&self.admission).try_acquire_owned() {
            Ok(permit) => Ok(Admission {
                permit,
                slots: Arc::clone(&self.slots),
            }),
            Err(_) => {
                debug!(
                    target: LOG_TARGET,
                    capacity = self.capacity(),
                    "Rejecting submission, pool saturated"
                );
                Err(FailureError::Backpressure {
                    capacity: self.capacity(),
                })
            }
        }
    }
}

/// An admitted submission waiting for an execution slot.
pub struct Admission {
    permit: OwnedSemaphorePermit,
    slots: Arc<Semaphore>,
}

impl Admission {
    pub async fn slot(self) -> Result<Ticket, FailureError> {
        let slot = self
            .slots
            .acquire_owned()
            .await
            .map_err(|_| FailureError::Internal("worker pool closed".into()))?;
        Ok(Ticket {
            _admission: self.permit,
            _slot: slot,
        })
    }
}

/// Proof of a held execution slot; releases both places when dropped.
pub struct Ticket {
    _admission: OwnedSemaphorePermit,
    _slot: OwnedSemaphorePermit,
}
