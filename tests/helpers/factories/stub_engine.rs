use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::command::{Command, Language};
use crate::engine::errors::{FailureError, GatewayError, UsageError};
use crate::engine::invocation::{CancelHandle, Engine, Interrupt, Invocation};
use crate::engine::lifecycle::{Lifecycle, State};
use crate::shared::media::{MediaType, TypeMatchingResolver, types};

/// Observable side effects of stub invocations.
#[derive(Default, Debug)]
pub struct StubCounters {
    pub prepared: AtomicUsize,
    pub executed: AtomicUsize,
    pub cancelled: AtomicUsize,
    pub written: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub released: AtomicUsize,
}

impl StubCounters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Waits until `counter` reaches `expected`, for effects that happen on a
    /// worker thread after the future resolved.
    pub async fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[derive(Clone, Debug)]
enum Behavior {
    Rows(Vec<String>, Vec<Vec<String>>),
    Fail(String),
    Block,
}

#[derive(Clone, Copy)]
enum Format {
    Csv,
    Xml,
}

/// An engine whose invocations return canned rows, fail, or block until
/// cancelled.
pub struct StubEngine {
    language: Language,
    behavior: Behavior,
    counters: Arc<StubCounters>,
    formats: TypeMatchingResolver<Format>,
}

impl StubEngine {
    pub fn new(language: &str) -> Self {
        Self {
            language: Language::new(language),
            behavior: Behavior::Rows(vec!["1".into()], vec![vec!["1".into()]]),
            counters: Arc::new(StubCounters::default()),
            formats: TypeMatchingResolver::builder()
                .register(types::text_csv(), || Format::Csv)
                .register(types::application_xml(), || Format::Xml)
                .build(),
        }
    }

    pub fn returning(mut self, header: &[&str], rows: &[&[&str]]) -> Self {
        self.behavior = Behavior::Rows(
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
        );
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.behavior = Behavior::Fail(message.into());
        self
    }

    pub fn blocking(mut self) -> Self {
        self.behavior = Behavior::Block;
        self
    }

    pub fn counters(&self) -> Arc<StubCounters> {
        Arc::clone(&self.counters)
    }

    pub fn into_shared(self) -> (Arc<dyn Engine>, Arc<StubCounters>) {
        let counters = self.counters();
        (Arc::new(self), counters)
    }
}

impl Engine for StubEngine {
    fn language(&self) -> Language {
        self.language.clone()
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn prepare(&self, command: &Command) -> Result<Box<dyn Invocation>, GatewayError> {
        self.counters.prepared.fetch_add(1, Ordering::SeqCst);
        if command.text().contains("syntax error") {
            return Err(UsageError::invalid_query("unexpected token").into());
        }
        let selection = self.formats.select(command.acceptable())?;
        let lifecycle = Arc::new(Lifecycle::new());
        let gate = Arc::new(Gate {
            open: Mutex::new(false),
            signal: Condvar::new(),
            counters: Arc::clone(&self.counters),
        });
        lifecycle.prepared();
        Ok(Box::new(StubInvocation {
            lifecycle,
            gate,
            behavior: self.behavior.clone(),
            counters: Arc::clone(&self.counters),
            format: selection.value,
            produces: selection.media_type,
            rows: None,
        }))
    }
}

struct Gate {
    open: Mutex<bool>,
    signal: Condvar,
    counters: Arc<StubCounters>,
}

impl Interrupt for Gate {
    fn interrupt(&self) {
        self.counters.cancelled.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock();
        *open = true;
        self.signal.notify_all();
    }
}

pub struct StubInvocation {
    lifecycle: Arc<Lifecycle>,
    gate: Arc<Gate>,
    behavior: Behavior,
    counters: Arc<StubCounters>,
    format: Format,
    produces: MediaType,
    rows: Option<(Vec<String>, Vec<Vec<String>>)>,
}

impl Invocation for StubInvocation {
    fn produces(&self) -> &MediaType {
        &self.produces
    }

    fn execute(&mut self) -> Result<(), GatewayError> {
        self.lifecycle.begin_execute()?;
        self.counters.executed.fetch_add(1, Ordering::SeqCst);
        let outcome = match &self.behavior {
            Behavior::Rows(header, rows) => Ok((header.clone(), rows.clone())),
            Behavior::Fail(message) => Err(FailureError::backend(message).into()),
            Behavior::Block => {
                let mut open = self.gate.open.lock();
                while !*open {
                    self.gate.signal.wait(&mut open);
                }
                Err(FailureError::Cancelled.into())
            }
        };
        self.rows = Some(self.lifecycle.finish_execute(outcome)?);
        Ok(())
    }

    fn write(&mut self, sink: &mut dyn Write) -> Result<(), GatewayError> {
        self.lifecycle.begin_write();
        self.counters.written.fetch_add(1, Ordering::SeqCst);
        let Some((header, rows)) = &self.rows else {
            return Err(FailureError::Internal("no result captured".into()).into());
        };
        let write = |sink: &mut dyn Write| -> std::io::Result<()> {
            match self.format {
                Format::Csv => {
                    write!(sink, "{}\r\n", header.join(","))?;
                    for row in rows {
                        write!(sink, "{}\r\n", row.join(","))?;
                    }
                }
                Format::Xml => {
                    write!(sink, "<rows>")?;
                    for row in rows {
                        write!(sink, "<row>{}</row>", row.join(","))?;
                    }
                    write!(sink, "</rows>")?;
                }
            }
            Ok(())
        };
        write(sink).map_err(|e| FailureError::Write(e).into())
    }

    fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(Arc::clone(&self.lifecycle), self.gate.clone())
    }

    fn close(&mut self) {
        self.counters.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.lifecycle.close() {
            self.rows = None;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}
