use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rusqlite::types::Value;

use crate::shared::response::csv::quote;

pub const NULL_VALUE: &str = "null";

/// A materialized result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Canonical `xs:double` lexical form, e.g. `1.5E0`, `-2.0E3`, `INF`.
pub fn xs_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF".into() } else { "-INF".into() };
    }
    let raw = format!("{value:E}");
    match raw.split_once('E') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => {
            format!("{mantissa}.0E{exponent}")
        }
        _ => raw,
    }
}

/// Cell text in the csv representation: typed literals, quoted text.
pub fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => NULL_VALUE.into(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => xs_double(*r),
        Value::Text(text) => quote(text),
        Value::Blob(bytes) => STANDARD.encode(bytes),
    }
}

/// Plain cell text for the rowset representation; `None` marks SQL NULL.
pub fn plain_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Text(text) => Some(text.clone()),
        Value::Blob(bytes) => Some(STANDARD.encode(bytes)),
    }
}

/// Storage class name of a value, as reported by `typeof()`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Integer(_) => "INTEGER",
        Value::Real(_) => "REAL",
        Value::Text(_) => "TEXT",
        Value::Blob(_) => "BLOB",
    }
}
