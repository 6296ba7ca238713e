use crate::command::{Command, Identity, Language, Operation};
use crate::shared::media::MediaType;

pub struct CommandFactory {
    language: Language,
    operation: Operation,
    text: String,
    parameters: Vec<(String, String)>,
    acceptable: Vec<MediaType>,
    owner: Option<Identity>,
}

impl CommandFactory {
    pub fn sql() -> Self {
        Self::new(Language::sql(), "SELECT 1")
    }

    pub fn sparql() -> Self {
        Self::new(Language::sparql(), "SELECT * WHERE { ?s ?p ?o }")
    }

    fn new(language: Language, text: &str) -> Self {
        Self {
            language,
            operation: Operation::Query,
            text: text.into(),
            parameters: Vec::new(),
            acceptable: vec![MediaType::new("text", "csv")],
            owner: None,
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Language::new(language);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.into();
        self
    }

    pub fn as_update(mut self) -> Self {
        self.operation = Operation::Update;
        self
    }

    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Replaces the acceptable types, e.g. `&["application/json", "text/csv"]`.
    pub fn accepting(mut self, types: &[&str]) -> Self {
        self.acceptable = types
            .iter()
            .map(|raw| raw.parse().expect("valid media type"))
            .collect();
        self
    }

    pub fn with_owner(mut self, name: &str) -> Self {
        self.owner = Some(Identity::new(name));
        self
    }

    pub fn create(self) -> Command {
        let mut builder = Command::builder(self.language, self.text)
            .operation(self.operation)
            .acceptable(self.acceptable);
        for (name, value) in self.parameters {
            builder = builder.parameter(name, value);
        }
        if let Some(owner) = self.owner {
            builder = builder.owner(owner);
        }
        builder.build()
    }
}
