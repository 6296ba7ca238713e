use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const WILDCARD: &str = "*";

/// A negotiable content type: `type/subtype; key=value`.
///
/// Type, subtype and parameter names are stored lower-cased so equality is
/// case-insensitive. Parameter values keep their case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    kind: String,
    subtype: String,
    parameters: BTreeMap<String, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("empty media type")]
    Empty,

    #[error("media type <{0}> is missing a subtype")]
    MissingSubtype(String),

    #[error("malformed parameter <{0}>")]
    MalformedParameter(String),
}

impl MediaType {
    pub fn new(kind: &str, subtype: &str) -> Self {
        Self {
            kind: kind.trim().to_ascii_lowercase(),
            subtype: subtype.trim().to_ascii_lowercase(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn wildcard() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters
            .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_wildcard_type(&self) -> bool {
        self.kind == WILDCARD
    }

    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD
    }

    /// True if this type names no wildcard at all.
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// Same type and subtype, ignoring parameters.
    pub fn same_essence(&self, other: &MediaType) -> bool {
        self.kind == other.kind && self.subtype == other.subtype
    }

    /// The media type without any parameters.
    pub fn essence(&self) -> MediaType {
        Self::new(&self.kind, &self.subtype)
    }

    /// Checks whether this (requested) type accepts the given registered pattern.
    ///
    /// Rules, in order: exact match, subtype wildcard, structured-syntax suffix
    /// (`application/ld+json` accepts `application/json`), full wildcard.
    /// Parameters present on `registered` must be present with equal values on
    /// `self`; parameters only present on `self` are ignored.
    pub fn accepts(&self, registered: &MediaType) -> bool {
        if !self.carries_parameters_of(registered) {
            return false;
        }
        if self.is_wildcard_type() {
            return true;
        }
        if self.kind != registered.kind {
            return false;
        }
        self.subtype == registered.subtype
            || self.is_wildcard_subtype()
            || self.has_suffix(&registered.subtype)
    }

    fn has_suffix(&self, subtype: &str) -> bool {
        self.subtype
            .rsplit_once('+')
            .is_some_and(|(_, suffix)| suffix == subtype)
    }

    fn carries_parameters_of(&self, registered: &MediaType) -> bool {
        registered
            .parameters
            .iter()
            .all(|(name, value)| self.parameters.get(name) == Some(value))
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut segments = raw.split(';');
        let essence = segments.next().unwrap_or_default().trim();
        if essence.is_empty() {
            return Err(MediaTypeError::Empty);
        }
        let mut media_type = match essence.split_once('/') {
            Some((kind, subtype)) if !kind.trim().is_empty() && !subtype.trim().is_empty() => {
                MediaType::new(kind, subtype)
            }
            // a lone `*` is commonly sent as shorthand for `*/*`
            None if essence == WILDCARD => MediaType::wildcard(),
            _ => return Err(MediaTypeError::MissingSubtype(essence.to_string())),
        };
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (name, value) = segment
                .split_once('=')
                .ok_or_else(|| MediaTypeError::MalformedParameter(segment.to_string()))?;
            if name.trim().is_empty() {
                return Err(MediaTypeError::MalformedParameter(segment.to_string()));
            }
            media_type = media_type.with_parameter(name, value.trim().trim_matches('"'));
        }
        Ok(media_type)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (name, value) in &self.parameters {
            write!(f, "; {name}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Well-known types used by the bundled engines.
pub mod types {
    use super::MediaType;

    pub fn text_csv() -> MediaType {
        MediaType::new("text", "csv")
    }

    pub fn text_plain() -> MediaType {
        MediaType::new("text", "plain")
    }

    pub fn text_turtle() -> MediaType {
        MediaType::new("text", "turtle")
    }

    pub fn application_xml() -> MediaType {
        MediaType::new("application", "xml")
    }

    pub fn application_json() -> MediaType {
        MediaType::new("application", "json")
    }

    pub fn webrowset_xml() -> MediaType {
        MediaType::new("application", "webrowset+xml")
    }

    pub fn sql_results_xml() -> MediaType {
        MediaType::new("application", "sql-results+xml")
    }

    pub fn sparql_results_xml() -> MediaType {
        MediaType::new("application", "sparql-results+xml")
    }

    pub fn sparql_results_json() -> MediaType {
        MediaType::new("application", "sparql-results+json")
    }

    pub fn n_triples() -> MediaType {
        MediaType::new("application", "n-triples")
    }

    pub fn rdf_json() -> MediaType {
        MediaType::new("application", "rdf+json")
    }

    pub fn vnd_error_json() -> MediaType {
        MediaType::new("application", "vnd.error+json")
    }
}
