use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::types::Value;
use rusqlite::{Connection, InterruptHandle};
use tracing::{debug, warn};

use crate::engine::cursor::{Cursor, Feed};
use crate::engine::errors::{FailureError, GatewayError};
use crate::engine::invocation::{CancelHandle, Interrupt, Invocation};
use crate::engine::lifecycle::{Lifecycle, State};
use crate::engine::sql::errors::{Phase, translate};
use crate::engine::sql::values::Table;
use crate::engine::sql::writers::{QueryFormat, UpdateFormat, csv_header, csv_row};
use crate::shared::media::MediaType;

const LOG_TARGET: &str = "engine::sql";

/// Virtual machine steps between two checks of the interrupt flag.
const PROGRESS_STEPS: i32 = 1_000;

pub(crate) enum Kind {
    Query(QueryFormat),
    Update(UpdateFormat),
}

enum Captured {
    /// Rows stay on the cursor until written.
    Streaming(Vec<String>),
    Rows(Table),
    Affected(usize),
}

type RowCursor = Cursor<Vec<String>, Vec<Value>, Connection>;

/// Stops the running statement and every later step on the connection.
///
/// `sqlite3_interrupt` alone is dropped when no statement is running yet,
/// so the flag is also polled from a progress handler.
struct SqlInterrupt {
    handle: InterruptHandle,
    requested: Arc<AtomicBool>,
}

impl SqlInterrupt {
    fn install(connection: &Connection) -> Self {
        let requested = Arc::new(AtomicBool::new(false));
        let polled = Arc::clone(&requested);
        connection.progress_handler(PROGRESS_STEPS, Some(move || polled.load(Ordering::SeqCst)));
        Self {
            handle: connection.get_interrupt_handle(),
            requested,
        }
    }

    fn check(requested: &AtomicBool) -> Result<(), GatewayError> {
        if requested.load(Ordering::SeqCst) {
            return Err(FailureError::Cancelled.into());
        }
        Ok(())
    }
}

impl Interrupt for SqlInterrupt {
    fn interrupt(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.handle.interrupt();
    }
}

/// One SQL statement bound to its own connection.
///
/// Queries step on a cursor thread that owns the connection until close.
pub struct SqlInvocation {
    lifecycle: Arc<Lifecycle>,
    interrupt: Arc<SqlInterrupt>,
    connection: Option<Connection>,
    cursor: Option<RowCursor>,
    sql: String,
    parameters: Vec<(usize, String)>,
    kind: Kind,
    produces: MediaType,
    max_rows: usize,
    captured: Option<Captured>,
}

impl SqlInvocation {
    pub(crate) fn new(
        connection: Connection,
        sql: String,
        parameters: Vec<(usize, String)>,
        kind: Kind,
        produces: MediaType,
        max_rows: usize,
    ) -> Self {
        let lifecycle = Arc::new(Lifecycle::new());
        let interrupt = Arc::new(SqlInterrupt::install(&connection));
        lifecycle.prepared();
        Self {
            lifecycle,
            interrupt,
            connection: Some(connection),
            cursor: None,
            sql,
            parameters,
            kind,
            produces,
            max_rows,
            captured: None,
        }
    }

    fn run(&mut self) -> Result<Captured, GatewayError> {
        let connection = self
            .connection
            .take()
            .ok_or_else(|| FailureError::Internal("connection already released".into()))?;

        let format = match self.kind {
            Kind::Query(format) => format,
            Kind::Update(_) => {
                let outcome = update(&connection, &self.sql, &self.parameters, &self.interrupt.requested);
                self.connection = Some(connection);
                return outcome.map(Captured::Affected);
            }
        };

        let sql = self.sql.clone();
        let parameters = self.parameters.clone();
        let requested = Arc::clone(&self.interrupt.requested);
        let cursor = self.cursor.insert(Cursor::spawn("sql-cursor", move |feed| {
            if let Err(error) = query(&connection, &sql, &parameters, &requested, feed) {
                feed.fail(error);
            }
            connection
        })?);

        let columns = cursor.header()?;
        if format.streams() {
            return Ok(Captured::Streaming(columns));
        }
        let rows = cursor.collect(self.max_rows)?;
        debug!(target: LOG_TARGET, rows = rows.len(), "Query materialized");
        Ok(Captured::Rows(Table { columns, rows }))
    }
}

fn bind<'c>(
    connection: &'c Connection,
    sql: &str,
    parameters: &[(usize, String)],
) -> Result<rusqlite::Statement<'c>, GatewayError> {
    let mut statement = connection
        .prepare(sql)
        .map_err(|e| translate(e, Phase::Compile))?;
    for (index, value) in parameters {
        statement
            .raw_bind_parameter(*index, value)
            .map_err(|e| translate(e, Phase::Compile))?;
    }
    Ok(statement)
}

fn update(
    connection: &Connection,
    sql: &str,
    parameters: &[(usize, String)],
    requested: &AtomicBool,
) -> Result<usize, GatewayError> {
    let mut statement = bind(connection, sql, parameters)?;
    SqlInterrupt::check(requested)?;
    let affected = statement
        .raw_execute()
        .map_err(|e| translate(e, Phase::Execute))?;
    debug!(target: LOG_TARGET, affected, "Update executed");
    Ok(affected)
}

/// Steps the statement, feeding rows until done or the reader is gone.
fn query(
    connection: &Connection,
    sql: &str,
    parameters: &[(usize, String)],
    requested: &AtomicBool,
    feed: &Feed<Vec<String>, Vec<Value>>,
) -> Result<(), GatewayError> {
    let mut statement = bind(connection, sql, parameters)?;
    let columns: Vec<String> = statement
        .column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let width = columns.len();
    if !feed.header(columns) {
        return Ok(());
    }
    SqlInterrupt::check(requested)?;

    let mut produced = 0usize;
    let mut rows = statement.raw_query();
    while let Some(row) = rows.next().map_err(|e| translate(e, Phase::Execute))? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(
                row.get::<_, Value>(idx)
                    .map_err(|e| translate(e, Phase::Execute))?,
            );
        }
        if !feed.row(values) {
            debug!(target: LOG_TARGET, produced, "Reader left before the last row");
            return Ok(());
        }
        produced += 1;
    }
    debug!(target: LOG_TARGET, produced, "Query stepped to completion");
    Ok(())
}

impl Invocation for SqlInvocation {
    fn produces(&self) -> &MediaType {
        &self.produces
    }

    fn execute(&mut self) -> Result<(), GatewayError> {
        self.lifecycle.begin_execute()?;
        let outcome = self.run();
        self.captured = Some(self.lifecycle.finish_execute(outcome)?);
        Ok(())
    }

    fn write(&mut self, sink: &mut dyn Write) -> Result<(), GatewayError> {
        self.lifecycle.begin_write();
        match (&self.kind, &self.captured) {
            (Kind::Query(QueryFormat::Csv), Some(Captured::Streaming(columns))) => {
                let cursor = self
                    .cursor
                    .as_mut()
                    .ok_or_else(|| FailureError::Internal("cursor already closed".into()))?;
                csv_header(columns, sink).map_err(FailureError::Write)?;
                while let Some(row) = cursor.next_row() {
                    csv_row(&row?, sink).map_err(FailureError::Write)?;
                }
                Ok(())
            }
            (Kind::Query(format), Some(Captured::Rows(table))) => format
                .write(&self.sql, table, sink)
                .map_err(|e| FailureError::Write(e).into()),
            (Kind::Update(format), Some(Captured::Affected(affected))) => format
                .write(&self.sql, *affected, sink)
                .map_err(|e| FailureError::Write(e).into()),
            _ => Err(FailureError::Internal("result does not match statement kind".into()).into()),
        }
    }

    fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(Arc::clone(&self.lifecycle), self.interrupt.clone())
    }

    fn close(&mut self) {
        if !self.lifecycle.close() {
            return;
        }
        self.captured = None;
        if let Some(cursor) = self.cursor.take() {
            self.interrupt.interrupt();
            self.connection = cursor.close();
        }
        if let Some(connection) = self.connection.take() {
            if let Err((_, error)) = connection.close() {
                warn!(target: LOG_TARGET, %error, "Failed to close connection");
            }
        }
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl Drop for SqlInvocation {
    fn drop(&mut self) {
        self.close();
    }
}
