use std::io::Write;
use std::sync::Arc;

use oxigraph::model::{Term, Triple};
use oxigraph::sparql::{CancellationToken, QueryResults, SparqlEvaluator};
use oxigraph::store::Store;
use spargebra::{Query, Update};
use tracing::debug;

use crate::engine::cursor::{Cursor, Feed};
use crate::engine::errors::{FailureError, GatewayError};
use crate::engine::invocation::{CancelHandle, Interrupt, Invocation};
use crate::engine::lifecycle::{Lifecycle, State};
use crate::engine::sparql::errors;
use crate::engine::sparql::formats::{GraphFormat, GraphWriter, SolutionsFormat, SolutionsWriter, UpdateFormat};
use crate::shared::media::MediaType;

const LOG_TARGET: &str = "engine::sparql";

pub(crate) enum Plan {
    Solutions(Query, SolutionsFormat),
    Graph(Query, GraphFormat),
    Update(Update, UpdateFormat),
}

enum Header {
    Variables(Vec<String>),
    Boolean(bool),
    Triples,
}

enum Item {
    Solution(Vec<Option<Term>>),
    Triple(Triple),
}

enum Captured {
    /// Solutions stay on the cursor until written.
    Solutions(Vec<String>),
    Boolean(bool),
    /// Triples stay on the cursor until written.
    Triples,
    Graph(Vec<Triple>),
    Updated,
}

type ResultCursor = Cursor<Header, Item, ()>;

/// Trips the cancellation token the evaluator polls during evaluation.
struct TokenInterrupt(CancellationToken);

impl Interrupt for TokenInterrupt {
    fn interrupt(&self) {
        self.0.cancel();
    }
}

/// One SPARQL operation against the engine's store.
///
/// Queries are evaluated on a cursor thread; updates run inline.
pub struct SparqlInvocation {
    lifecycle: Arc<Lifecycle>,
    token: CancellationToken,
    store: Store,
    text: String,
    plan: Plan,
    produces: MediaType,
    max_rows: usize,
    cursor: Option<ResultCursor>,
    captured: Option<Captured>,
}

impl SparqlInvocation {
    pub(crate) fn new(store: Store, text: String, plan: Plan, produces: MediaType, max_rows: usize) -> Self {
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.prepared();
        Self {
            lifecycle,
            token: CancellationToken::new(),
            store,
            text,
            plan,
            produces,
            max_rows,
            cursor: None,
            captured: None,
        }
    }

    fn run(&mut self) -> Result<Captured, GatewayError> {
        let query = match &self.plan {
            Plan::Solutions(query, _) | Plan::Graph(query, _) => query.clone(),
            Plan::Update(update, _) => {
                SparqlEvaluator::new()
                    .with_cancellation_token(self.token.clone())
                    .for_update(update.clone())
                    .on_store(&self.store)
                    .execute()
                    .map_err(errors::backend)?;
                debug!(target: LOG_TARGET, "Update applied");
                return Ok(Captured::Updated);
            }
        };

        let store = self.store.clone();
        let token = self.token.clone();
        let cursor = self.cursor.insert(Cursor::spawn("sparql-cursor", move |feed| {
            if let Err(error) = evaluate(&store, query, token, feed) {
                feed.fail(error);
            }
        })?);

        match cursor.header()? {
            Header::Variables(variables) => Ok(Captured::Solutions(variables)),
            Header::Boolean(value) => Ok(Captured::Boolean(value)),
            Header::Triples => match &self.plan {
                Plan::Graph(_, format) if !format.streams() => {
                    let mut triples = Vec::new();
                    for item in cursor.collect(self.max_rows)? {
                        if let Item::Triple(triple) = item {
                            triples.push(triple);
                        }
                    }
                    debug!(target: LOG_TARGET, triples = triples.len(), "Graph materialized");
                    Ok(Captured::Graph(triples))
                }
                _ => Ok(Captured::Triples),
            },
        }
    }
}

/// Evaluates the query and feeds its results until done or the reader is gone.
#[allow(unreachable_patterns)]
fn evaluate(
    store: &Store,
    query: Query,
    token: CancellationToken,
    feed: &Feed<Header, Item>,
) -> Result<(), GatewayError> {
    let results = SparqlEvaluator::new()
        .with_cancellation_token(token)
        .for_query(query)
        .on_store(store)
        .execute()
        .map_err(errors::evaluation)?;

    match results {
        QueryResults::Solutions(solutions) => {
            let variables: Vec<String> = solutions
                .variables()
                .iter()
                .map(|v| v.as_str().to_string())
                .collect();
            if !feed.header(Header::Variables(variables.clone())) {
                return Ok(());
            }
            let mut produced = 0usize;
            for solution in solutions {
                let solution = solution.map_err(errors::evaluation)?;
                let row = variables
                    .iter()
                    .map(|v| solution.get(v.as_str()).cloned())
                    .collect();
                if !feed.row(Item::Solution(row)) {
                    break;
                }
                produced += 1;
            }
            debug!(target: LOG_TARGET, produced, "Select evaluated");
            Ok(())
        }
        QueryResults::Boolean(value) => {
            feed.header(Header::Boolean(value));
            Ok(())
        }
        QueryResults::Graph(triples) => {
            if !feed.header(Header::Triples) {
                return Ok(());
            }
            for triple in triples {
                if !feed.row(Item::Triple(triple.map_err(errors::evaluation)?)) {
                    break;
                }
            }
            Ok(())
        }
        _ => Err(FailureError::Internal("unsupported query result kind".into()).into()),
    }
}

impl Invocation for SparqlInvocation {
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
        match (&self.plan, &self.captured, self.cursor.as_mut()) {
            (Plan::Solutions(_, format), Some(Captured::Solutions(variables)), Some(cursor)) => {
                let mut writer =
                    SolutionsWriter::start(*format, variables.clone(), sink).map_err(FailureError::Write)?;
                while let Some(item) = cursor.next_row() {
                    if let Item::Solution(row) = item? {
                        writer.row(&row).map_err(FailureError::Write)?;
                    }
                }
                writer.finish().map_err(FailureError::Write)?;
                Ok(())
            }
            (Plan::Solutions(_, format), Some(Captured::Boolean(value)), _) => format
                .write_boolean(*value, sink)
                .map_err(|e| FailureError::Write(e).into()),
            (Plan::Graph(_, format), Some(Captured::Triples), Some(cursor)) => {
                let mut writer = GraphWriter::start(*format, sink);
                while let Some(item) = cursor.next_row() {
                    if let Item::Triple(triple) = item? {
                        writer.triple(&triple).map_err(FailureError::Write)?;
                    }
                }
                writer.finish().map_err(FailureError::Write)?;
                Ok(())
            }
            (Plan::Graph(_, format), Some(Captured::Graph(triples)), _) => format
                .write(triples, sink)
                .map_err(|e| FailureError::Write(e).into()),
            (Plan::Update(_, format), Some(Captured::Updated), _) => format
                .write(&self.text, sink)
                .map_err(|e| FailureError::Write(e).into()),
            _ => Err(FailureError::Internal("result does not match the query form".into()).into()),
        }
    }

    fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(
            Arc::clone(&self.lifecycle),
            Arc::new(TokenInterrupt(self.token.clone())),
        )
    }

    fn close(&mut self) {
        if !self.lifecycle.close() {
            return;
        }
        self.captured = None;
        if let Some(cursor) = self.cursor.take() {
            self.token.cancel();
            cursor.close();
        }
    }

    fn state(&self) -> State {
        self.lifecycle.state()
    }
}

impl Drop for SparqlInvocation {
    fn drop(&mut self) {
        self.close();
    }
}
