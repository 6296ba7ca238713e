use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::engine::errors::{FailureError, GatewayError};

const LOG_TARGET: &str = "engine::cursor";

/// Rows the producer may run ahead of the writer.
const BUFFERED_ROWS: usize = 64;

enum Message<H, R> {
    Header(H),
    Row(R),
    Failed(GatewayError),
    Done,
}

/// Producer side of a [`Cursor`], used on the cursor thread.
pub(crate) struct Feed<H, R> {
    sender: SyncSender<Message<H, R>>,
}

impl<H, R> Feed<H, R> {
    /// Returns false once the reader is gone.
    pub fn header(&self, header: H) -> bool {
        self.sender.send(Message::Header(header)).is_ok()
    }

    /// Blocks while the buffer is full. Returns false once the reader is gone.
    pub fn row(&self, row: R) -> bool {
        self.sender.send(Message::Row(row)).is_ok()
    }

    pub fn fail(&self, error: GatewayError) {
        let _ = self.sender.send(Message::Failed(error));
    }
}

/// Results evaluated on a dedicated thread and read back in order.
///
/// The thread sends one header, then rows until it is done or fails.
/// Whatever the thread returns is handed back by [`Cursor::close`].
pub(crate) struct Cursor<H, R, T> {
    messages: Option<Receiver<Message<H, R>>>,
    peeked: Option<Message<H, R>>,
    worker: Option<JoinHandle<T>>,
}

impl<H, R, T> Cursor<H, R, T>
where
    H: Send + 'static,
    R: Send + 'static,
    T: Send + 'static,
{
    pub fn spawn<F>(name: &str, produce: F) -> Result<Self, GatewayError>
    where
        F: FnOnce(&Feed<H, R>) -> T + Send + 'static,
    {
        let (sender, receiver) = sync_channel(BUFFERED_ROWS);
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let feed = Feed { sender };
                let output = produce(&feed);
                let _ = feed.sender.send(Message::Done);
                output
            })
            .map_err(|e| FailureError::Internal(format!("cannot start cursor thread: {e}")))?;
        Ok(Self {
            messages: Some(receiver),
            peeked: None,
            worker: Some(worker),
        })
    }

    /// Waits for the header and the first row, so evaluation errors
    /// surface here rather than halfway through the output.
    pub fn header(&mut self) -> Result<H, GatewayError> {
        let header = match self.receive() {
            Some(Message::Header(header)) => header,
            Some(Message::Failed(error)) => return Err(error),
            _ => return Err(FailureError::Internal("cursor produced no header".into()).into()),
        };
        match self.receive() {
            Some(Message::Failed(error)) => Err(error),
            first => {
                self.peeked = first;
                Ok(header)
            }
        }
    }

    pub fn next_row(&mut self) -> Option<Result<R, GatewayError>> {
        let message = match self.peeked.take() {
            Some(message) => message,
            None => self.receive()?,
        };
        match message {
            Message::Row(row) => Some(Ok(row)),
            Message::Failed(error) => {
                self.messages = None;
                Some(Err(error))
            }
            Message::Done => {
                self.messages = None;
                None
            }
            Message::Header(_) => Some(Err(FailureError::Internal("duplicate cursor header".into()).into())),
        }
    }

    /// Drains the cursor, failing once more than `limit` rows arrive.
    pub fn collect(&mut self, limit: usize) -> Result<Vec<R>, GatewayError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row() {
            if rows.len() >= limit {
                return Err(FailureError::ResourceExhausted { limit }.into());
            }
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Disconnects from the thread and joins it.
    ///
    /// A thread blocked inside evaluation must be interrupted first.
    pub fn close(mut self) -> Option<T> {
        self.peeked = None;
        self.messages = None;
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(output) => Some(output),
            Err(_) => {
                warn!(target: LOG_TARGET, "Cursor thread panicked");
                None
            }
        }
    }

    fn receive(&mut self) -> Option<Message<H, R>> {
        match self.messages.as_ref()?.recv() {
            Ok(message) => Some(message),
            Err(_) => {
                self.messages = None;
                Some(Message::Failed(
                    FailureError::Internal("cursor thread stopped unexpectedly".into()).into(),
                ))
            }
        }
    }
}
