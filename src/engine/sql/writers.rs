use std::io::{self, Write};

use rusqlite::types::Value;

use crate::engine::sql::values::{Table, csv_cell, plain_cell, type_name};
use crate::shared::response::XmlWriter;
use crate::shared::response::csv::{field, quote, write_record};

pub const WEBROWSET_NS: &str = "http://java.sun.com/xml/ns/jdbc";
pub const UPDATE_NS: &str = "urn:snel-gateway:sql";

/// Writers for row-returning statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFormat {
    WebRowSet,
    Csv,
}

/// Writers for statements reporting an affected row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFormat {
    Xml,
    Csv,
}

impl QueryFormat {
    /// Whether rows can be written as they are stepped.
    pub fn streams(&self) -> bool {
        matches!(self, QueryFormat::Csv)
    }

    pub fn write(&self, statement: &str, table: &Table, out: &mut dyn Write) -> io::Result<()> {
        match self {
            QueryFormat::WebRowSet => write_webrowset(statement, table, out),
            QueryFormat::Csv => write_csv(table, out),
        }
    }
}

impl UpdateFormat {
    pub fn write(&self, statement: &str, affected: usize, out: &mut dyn Write) -> io::Result<()> {
        match self {
            UpdateFormat::Xml => {
                let mut xml = XmlWriter::new(out);
                xml.declaration()?;
                xml.start("sql", &[("xmlns", UPDATE_NS)])?;
                xml.empty("head", &[("statement", statement)])?;
                xml.empty("update", &[("affected", affected.to_string().as_str())])?;
                xml.finish()
            }
            UpdateFormat::Csv => {
                write_record(out, &["statement", "affected"])?;
                write!(out, "{},{}", quote(statement), affected)
            }
        }
    }
}

pub fn write_csv(table: &Table, out: &mut dyn Write) -> io::Result<()> {
    csv_header(&table.columns, out)?;
    for row in &table.rows {
        csv_row(row, out)?;
    }
    Ok(())
}

pub fn csv_header(columns: &[String], out: &mut dyn Write) -> io::Result<()> {
    let cells: Vec<_> = columns.iter().map(|name| field(name)).collect();
    write_record(out, &cells)
}

pub fn csv_row(row: &[Value], out: &mut dyn Write) -> io::Result<()> {
    let cells: Vec<String> = row.iter().map(csv_cell).collect();
    write_record(out, &cells)
}

/// Serializes the table as a JDBC `webRowSet` document.
///
/// Column metadata SQLite cannot report is written as `<null/>`.
pub fn write_webrowset(statement: &str, table: &Table, out: &mut dyn Write) -> io::Result<()> {
    let mut xml = XmlWriter::new(out);
    xml.declaration()?;
    xml.start("webRowSet", &[("xmlns", WEBROWSET_NS)])?;

    xml.start("properties", &[])?;
    xml.leaf("command", statement)?;
    xml.leaf("concurrency", "1008")?;
    nullable(&mut xml, "datasource", None)?;
    xml.leaf("escape-processing", "true")?;
    xml.leaf("fetch-direction", "1000")?;
    xml.leaf("fetch-size", "0")?;
    xml.leaf("isolation-level", "0")?;
    xml.empty("key-columns", &[])?;
    xml.empty("map", &[])?;
    xml.leaf("max-field-size", "0")?;
    xml.leaf("max-rows", "0")?;
    xml.leaf("query-timeout", "0")?;
    xml.leaf("read-only", "true")?;
    xml.leaf("rowset-type", "ResultSet.TYPE_SCROLL_INSENSITIVE")?;
    xml.leaf("show-deleted", "false")?;
    xml.empty("table-name", &[])?;
    nullable(&mut xml, "url", None)?;
    xml.start("sync-provider", &[])?;
    for name in [
        "sync-provider-name",
        "sync-provider-vendor",
        "sync-provider-version",
        "sync-provider-grade",
        "data-source-lock",
    ] {
        xml.empty(name, &[])?;
    }
    xml.end()?;
    xml.end()?;

    xml.start("metadata", &[])?;
    xml.leaf("column-count", &table.columns.len().to_string())?;
    for (idx, name) in table.columns.iter().enumerate() {
        xml.start("column-definition", &[])?;
        xml.leaf("column-index", &(idx + 1).to_string())?;
        xml.leaf("column-label", name)?;
        xml.leaf("column-name", name)?;
        let observed = table
            .rows
            .iter()
            .map(|row| type_name(&row[idx]))
            .find(|name| *name != "NULL");
        nullable(&mut xml, "column-type-name", observed)?;
        xml.end()?;
    }
    xml.end()?;

    xml.start("data", &[])?;
    for row in &table.rows {
        xml.start("currentRow", &[])?;
        for value in row {
            xml.start("columnValue", &[])?;
            match plain_cell(value) {
                Some(text) => xml.text(&text)?,
                None => xml.empty("null", &[])?,
            }
            xml.end()?;
        }
        xml.end()?;
    }
    xml.finish()
}

fn nullable(xml: &mut XmlWriter<'_>, name: &str, text: Option<&str>) -> io::Result<()> {
    match text {
        Some(text) if !text.is_empty() => xml.leaf(name, text),
        _ => {
            xml.start(name, &[])?;
            xml.empty("null", &[])?;
            xml.end()
        }
    }
}
