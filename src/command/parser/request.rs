use tracing::debug;

use crate::command::types::{Command, Identity, Language, Operation};
use crate::engine::errors::UsageError;
use crate::shared::media::{MediaType, parse_accept};

const LOG_TARGET: &str = "command::parser";

/// Query parameter overriding the `Accept` header for clients that cannot set it.
pub const ACCEPT_OVERRIDE: &str = "_type";

/// Transport-level inputs of one request, as extracted by the protocol layer.
#[derive(Debug, Default, Clone)]
pub struct RequestParts {
    /// Language tag taken from the request path.
    pub language: String,
    pub body: Option<Body>,
    pub form: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub accept: Option<String>,
    pub owner: Option<Identity>,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub content_type: MediaType,
    pub text: String,
}

/// Acceptable types assumed when a client names nothing concrete.
#[derive(Debug, Clone)]
pub struct NegotiationDefaults {
    pub acceptable: Vec<MediaType>,
}

impl Default for NegotiationDefaults {
    fn default() -> Self {
        Self {
            acceptable: vec![MediaType::new("application", "xml")],
        }
    }
}

/// Builds a [`Command`] from request parts.
///
/// The operation text must come from exactly one of: the body, a form field
/// named `query`/`update`, or a query parameter named `query`/`update`.
pub fn parse_request(
    parts: RequestParts,
    defaults: &NegotiationDefaults,
) -> Result<Command, UsageError> {
    let language = Language::new(&parts.language);
    if language.as_str().is_empty() {
        return Err(UsageError::IllegalCommand("missing language".into()));
    }

    let mut sources: Vec<(Operation, String)> = Vec::new();
    if let Some(body) = &parts.body {
        sources.push((operation_of_body(&language, &body.content_type)?, body.text.clone()));
    }
    let mut parameters = Vec::new();
    let mut accept_override = None;
    for (name, value) in parts.form.iter().chain(parts.query.iter()) {
        match operation_of_field(name) {
            Some(operation) => sources.push((operation, value.clone())),
            None if name == ACCEPT_OVERRIDE => accept_override = Some(value.clone()),
            None => parameters.push((name.clone(), value.clone())),
        }
    }

    let (operation, text) = match sources.len() {
        0 => {
            return Err(UsageError::IllegalCommand(
                "parameter query or update is required".into(),
            ));
        }
        1 => sources.remove(0),
        n => {
            return Err(UsageError::IllegalCommand(format!(
                "expected exactly one query source but found {n}"
            )));
        }
    };
    if text.trim().is_empty() {
        return Err(UsageError::IllegalCommand(format!(
            "illegal parameter {operation} found : empty value"
        )));
    }

    let acceptable = negotiate(accept_override.or(parts.accept), defaults)?;
    debug!(target: LOG_TARGET, %language, %operation, ?acceptable, "Parsed request");

    let mut builder = Command::builder(language, text)
        .operation(operation)
        .acceptable(acceptable);
    for (name, value) in parameters {
        builder = builder.parameter(name, value);
    }
    if let Some(owner) = parts.owner {
        builder = builder.owner(owner);
    }
    Ok(builder.build())
}

fn operation_of_field(name: &str) -> Option<Operation> {
    match name {
        "query" => Some(Operation::Query),
        "update" => Some(Operation::Update),
        _ => None,
    }
}

fn operation_of_body(language: &Language, content_type: &MediaType) -> Result<Operation, UsageError> {
    let expected_query = format!("{}-query", language);
    let expected_update = format!("{}-update", language);
    if content_type.kind() == "application" && content_type.subtype() == expected_query {
        Ok(Operation::Query)
    } else if content_type.kind() == "application" && content_type.subtype() == expected_update {
        Ok(Operation::Update)
    } else {
        Err(UsageError::IllegalCommand(format!(
            "unsupported body content type <{content_type}> - expected application/{expected_query} or application/{expected_update}"
        )))
    }
}

fn negotiate(
    header: Option<String>,
    defaults: &NegotiationDefaults,
) -> Result<Vec<MediaType>, UsageError> {
    let parsed = match header {
        Some(raw) => parse_accept(&raw)
            .map_err(|e| UsageError::IllegalCommand(format!("malformed accept header: {e}")))?,
        None => Vec::new(),
    };
    if parsed.iter().all(|media_type| media_type.is_wildcard_type()) {
        return Ok(defaults.acceptable.clone());
    }
    Ok(parsed)
}
