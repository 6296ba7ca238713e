use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::shared::media::MediaType;

/// Query language tag, e.g. `sql` or `sparql`. Always lower-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn new(tag: &str) -> Self {
        Self(tag.trim().to_ascii_lowercase())
    }

    pub fn sql() -> Self {
        Self::new("sql")
    }

    pub fn sparql() -> Self {
        Self::new("sparql")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Language {
    fn from(tag: String) -> Self {
        Self::new(&tag)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the command reads or modifies the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Query,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Query => "query",
            Operation::Update => "update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated principal that issued a command.
///
/// Carried for backend-delegated authorization only; holding an identity
/// never grants anything by itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    secret: Option<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Immutable description of one query request.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    language: Language,
    operation: Operation,
    text: String,
    parameters: BTreeMap<String, String>,
    acceptable: Vec<MediaType>,
    owner: Option<Identity>,
    properties: IndexMap<String, String>,
}

impl Command {
    pub fn builder(language: Language, text: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            language,
            operation: Operation::Query,
            text: text.into(),
            parameters: BTreeMap::new(),
            acceptable: Vec::new(),
            owner: None,
            properties: IndexMap::new(),
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn acceptable(&self) -> &[MediaType] {
        &self.acceptable
    }

    pub fn owner(&self) -> Option<&Identity> {
        self.owner.as_ref()
    }

    /// Free-form properties for event emission and logging.
    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }
}

pub struct CommandBuilder {
    language: Language,
    operation: Operation,
    text: String,
    parameters: BTreeMap<String, String>,
    acceptable: Vec<MediaType>,
    owner: Option<Identity>,
    properties: IndexMap<String, String>,
}

impl CommandBuilder {
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn update(self) -> Self {
        self.operation(Operation::Update)
    }

    /// Binds a named query parameter; a later value for the same name replaces
    /// the earlier one.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn accept(mut self, media_type: MediaType) -> Self {
        self.acceptable.push(media_type);
        self
    }

    pub fn acceptable(mut self, media_types: impl IntoIterator<Item = MediaType>) -> Self {
        self.acceptable.extend(media_types);
        self
    }

    pub fn owner(mut self, owner: Identity) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Command {
        let mut properties = IndexMap::with_capacity(self.properties.len() + 3);
        properties.insert("language".to_string(), self.language.to_string());
        properties.insert("operation".to_string(), self.operation.to_string());
        if let Some(owner) = &self.owner {
            properties.insert("owner".to_string(), owner.name().to_string());
        }
        for (name, value) in self.properties {
            properties.entry(name).or_insert(value);
        }
        Command {
            language: self.language,
            operation: self.operation,
            text: self.text,
            parameters: self.parameters,
            acceptable: self.acceptable,
            owner: self.owner,
            properties,
        }
    }
}
