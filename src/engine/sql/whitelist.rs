use once_cell::sync::Lazy;
use regex::Regex;

// leading whitespace and comments, then the command keyword
static LEADING_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:\s+|--[^\n]*(?:\n|$)|/\*.*?\*/)*([A-Za-z]+)")
        .expect("valid keyword pattern")
});

/// Restricts the sql commands an engine accepts by their leading keyword.
#[derive(Debug, Clone, Default)]
pub struct CommandWhitelist {
    allowed: Option<Vec<String>>,
}

impl CommandWhitelist {
    pub fn any() -> Self {
        Self { allowed: None }
    }

    /// Only statements starting with one of `commands` (case-insensitive).
    pub fn allow_only<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: Some(
                commands
                    .into_iter()
                    .map(|c| c.as_ref().trim().to_ascii_uppercase())
                    .collect(),
            ),
        }
    }

    pub fn allows(&self, sql: &str) -> bool {
        let Some(allowed) = &self.allowed else {
            return true;
        };
        match command_of(sql) {
            Some(keyword) => allowed.iter().any(|a| *a == keyword),
            None => false,
        }
    }
}

/// The upper-cased leading keyword of a statement, if any.
pub fn command_of(sql: &str) -> Option<String> {
    LEADING_KEYWORD
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}
