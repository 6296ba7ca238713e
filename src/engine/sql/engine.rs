use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::command::{Command, Language, Operation};
use crate::engine::errors::{GatewayError, UsageError};
use crate::engine::invocation::{Engine, Invocation};
use crate::engine::sql::errors::{Phase, translate};
use crate::engine::sql::invocation::{Kind, SqlInvocation};
use crate::engine::sql::whitelist::CommandWhitelist;
use crate::engine::sql::writers::{QueryFormat, UpdateFormat};
use crate::shared::media::{TypeMatchingResolver, types};

const LOG_TARGET: &str = "engine::sql";

#[derive(Debug, Clone)]
pub struct SqlEngineConfig {
    pub language: Language,
    pub database: PathBuf,
    pub whitelist: CommandWhitelist,
    pub read_only: bool,
    pub max_rows: usize,
}

impl SqlEngineConfig {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            language: Language::sql(),
            database: database.into(),
            whitelist: CommandWhitelist::any(),
            read_only: false,
            max_rows: 10_000,
        }
    }
}

/// SQLite backed engine. Every invocation opens its own connection.
pub struct SqlEngine {
    config: SqlEngineConfig,
    query_formats: TypeMatchingResolver<QueryFormat>,
    update_formats: TypeMatchingResolver<UpdateFormat>,
}

impl SqlEngine {
    pub fn new(config: SqlEngineConfig) -> Self {
        info!(
            target: LOG_TARGET,
            language = %config.language,
            database = %config.database.display(),
            read_only = config.read_only,
            "Creating sql engine"
        );
        let query_formats = TypeMatchingResolver::builder()
            .register(types::webrowset_xml(), || QueryFormat::WebRowSet)
            .alias(types::sql_results_xml())
            .alias(types::application_xml())
            .register(types::text_csv(), || QueryFormat::Csv)
            .build();
        let update_formats = TypeMatchingResolver::builder()
            .register(types::sql_results_xml(), || UpdateFormat::Xml)
            .alias(types::application_xml())
            .register(types::text_csv(), || UpdateFormat::Csv)
            .build();
        Self {
            config,
            query_formats,
            update_formats,
        }
    }

    fn open(&self) -> Result<Connection, GatewayError> {
        let flags = if self.config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX
        };
        Connection::open_with_flags(&self.config.database, flags).map_err(|e| translate(e, Phase::Open))
    }
}

impl Engine for SqlEngine {
    fn language(&self) -> Language {
        self.config.language.clone()
    }

    fn name(&self) -> &str {
        "sqlite"
    }

    fn prepare(&self, command: &Command) -> Result<Box<dyn Invocation>, GatewayError> {
        let sql = command.text().trim();
        if sql.is_empty() {
            return Err(UsageError::IllegalCommand("empty sql statement".into()).into());
        }
        if !self.config.whitelist.allows(sql) {
            return Err(UsageError::Rejected(format!("illegal sql command <{sql}>")).into());
        }

        let (kind, produces) = match command.operation() {
            Operation::Query => {
                let selection = self.query_formats.select(command.acceptable())?;
                (Kind::Query(selection.value), selection.media_type)
            }
            Operation::Update => {
                if self.config.read_only {
                    return Err(UsageError::Rejected("engine is read-only".into()).into());
                }
                let selection = self.update_formats.select(command.acceptable())?;
                (Kind::Update(selection.value), selection.media_type)
            }
        };

        let connection = self.open()?;
        let parameters = {
            let statement = connection
                .prepare(sql)
                .map_err(|e| translate(e, Phase::Compile))?;
            if command.operation() == Operation::Query && !statement.readonly() {
                return Err(UsageError::IllegalCommand(
                    "statement modifies data - submit it as update".into(),
                )
                .into());
            }
            let mut bound = Vec::with_capacity(command.parameters().len());
            for (name, value) in command.parameters() {
                let index = statement
                    .parameter_index(&format!(":{name}"))
                    .map_err(|e| translate(e, Phase::Compile))?;
                match index {
                    Some(index) => bound.push((index, value.clone())),
                    None => debug!(target: LOG_TARGET, parameter = %name, "Ignoring unknown parameter"),
                }
            }
            if bound.len() != statement.parameter_count() {
                return Err(UsageError::invalid_query(format!(
                    "statement expects {} parameters but {} were bound",
                    statement.parameter_count(),
                    bound.len()
                ))
                .into());
            }
            bound
        };

        debug!(target: LOG_TARGET, operation = %command.operation(), format = %produces, "Prepared sql statement");
        Ok(Box::new(SqlInvocation::new(
            connection,
            sql.to_string(),
            parameters,
            kind,
            produces,
            self.config.max_rows,
        )))
    }
}
