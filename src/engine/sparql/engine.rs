use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use oxigraph::io::RdfFormat;
use oxigraph::store::Store;
use spargebra::SparqlParser;
use tracing::{debug, info};

use crate::command::{Command, Language, Operation};
use crate::engine::errors::{FailureError, GatewayError, UsageError};
use crate::engine::invocation::{Engine, Invocation};
use crate::engine::sparql::errors;
use crate::engine::sparql::formats::{GraphFormat, SolutionsFormat, UpdateFormat};
use crate::engine::sparql::invocation::{Plan, SparqlInvocation};
use crate::engine::sparql::syntax::{QueryForm, query_is_federated, update_is_federated};
use crate::shared::media::{TypeMatchingResolver, types};

const LOG_TARGET: &str = "engine::sparql";

#[derive(Debug, Clone)]
pub struct SparqlEngineConfig {
    pub language: Language,
    /// Turtle file loaded into the store at startup.
    pub dataset: Option<PathBuf>,
    pub allow_federated: bool,
    pub allow_update: bool,
    pub max_rows: usize,
}

impl Default for SparqlEngineConfig {
    fn default() -> Self {
        Self {
            language: Language::sparql(),
            dataset: None,
            allow_federated: false,
            allow_update: false,
            max_rows: 10_000,
        }
    }
}

/// In-memory oxigraph store answering SPARQL 1.1 queries and updates.
pub struct SparqlEngine {
    config: SparqlEngineConfig,
    store: Store,
    solutions_formats: TypeMatchingResolver<SolutionsFormat>,
    graph_formats: TypeMatchingResolver<GraphFormat>,
    update_formats: TypeMatchingResolver<UpdateFormat>,
}

impl SparqlEngine {
    pub fn new(config: SparqlEngineConfig) -> Result<Self, GatewayError> {
        let store = Store::new().map_err(errors::backend)?;
        let engine = Self {
            solutions_formats: TypeMatchingResolver::builder()
                .register(types::sparql_results_xml(), || SolutionsFormat::Xml)
                .alias(types::application_xml())
                .register(types::sparql_results_json(), || SolutionsFormat::Json)
                .alias(types::application_json())
                .register(types::text_csv(), || SolutionsFormat::Csv)
                .build(),
            graph_formats: TypeMatchingResolver::builder()
                .register(types::n_triples(), || GraphFormat::NTriples)
                .alias(types::text_turtle())
                .alias(types::text_plain())
                .register(types::rdf_json(), || GraphFormat::RdfJson)
                .alias(types::application_json())
                .build(),
            update_formats: TypeMatchingResolver::builder()
                .register(types::application_xml(), || UpdateFormat::Xml)
                .register(types::text_csv(), || UpdateFormat::Csv)
                .build(),
            store,
            config,
        };
        if let Some(dataset) = &engine.config.dataset {
            let file = File::open(dataset).map_err(|e| FailureError::Backend {
                message: format!("cannot open dataset {}", dataset.display()),
                source: Some(Box::new(e)),
            })?;
            engine.load_turtle(BufReader::new(file))?;
        }
        info!(
            target: LOG_TARGET,
            language = %engine.config.language,
            allow_update = engine.config.allow_update,
            allow_federated = engine.config.allow_federated,
            "Created sparql engine"
        );
        Ok(engine)
    }

    /// Adds Turtle data to the store.
    pub fn load_turtle(&self, reader: impl Read) -> Result<(), GatewayError> {
        self.store
            .load_from_reader(RdfFormat::Turtle, reader)
            .map_err(errors::backend)?;
        debug!(target: LOG_TARGET, triples = self.store.len().unwrap_or_default(), "Loaded dataset");
        Ok(())
    }

    fn reject_federated(&self, federated: bool) -> Result<(), GatewayError> {
        if federated && !self.config.allow_federated {
            return Err(UsageError::Rejected("federated queries are disabled".into()).into());
        }
        Ok(())
    }
}

impl Engine for SparqlEngine {
    fn language(&self) -> Language {
        self.config.language.clone()
    }

    fn name(&self) -> &str {
        "oxigraph"
    }

    fn prepare(&self, command: &Command) -> Result<Box<dyn Invocation>, GatewayError> {
        let text = command.text();
        if text.trim().is_empty() {
            return Err(UsageError::IllegalCommand("empty sparql operation".into()).into());
        }
        if !command.parameters().is_empty() {
            debug!(target: LOG_TARGET, count = command.parameters().len(), "Ignoring parameters");
        }

        let (plan, produces) = match command.operation() {
            Operation::Update => {
                if !self.config.allow_update {
                    return Err(UsageError::Rejected("sparql update is disabled".into()).into());
                }
                let update = SparqlParser::new()
                    .parse_update(text)
                    .map_err(errors::syntax)?;
                self.reject_federated(update_is_federated(&update))?;
                let selection = self.update_formats.select(command.acceptable())?;
                (Plan::Update(update, selection.value), selection.media_type)
            }
            Operation::Query => {
                let query = SparqlParser::new()
                    .parse_query(text)
                    .map_err(errors::syntax)?;
                self.reject_federated(query_is_federated(&query))?;
                if QueryForm::of(&query).is_graph() {
                    let selection = self.graph_formats.select(command.acceptable())?;
                    (Plan::Graph(query, selection.value), selection.media_type)
                } else {
                    let selection = self.solutions_formats.select(command.acceptable())?;
                    (Plan::Solutions(query, selection.value), selection.media_type)
                }
            }
        };

        debug!(target: LOG_TARGET, operation = %command.operation(), format = %produces, "Prepared sparql operation");
        Ok(Box::new(SparqlInvocation::new(
            self.store.clone(),
            text.to_string(),
            plan,
            produces,
            self.config.max_rows,
        )))
    }
}
