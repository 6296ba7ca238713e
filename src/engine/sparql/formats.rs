use std::io::{self, Write};

use oxigraph::model::{Term, Triple};
use serde_json::{Map, Value, json};

use crate::shared::response::XmlWriter;
use crate::shared::response::csv::{ROW_END, field, quote, write_record};

pub const RESULTS_NS: &str = "http://www.w3.org/2005/sparql-results#";
pub const UPDATE_NS: &str = "urn:snel-gateway:sparql";
const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Materialized variable bindings of a SELECT query.
#[derive(Debug, Clone, Default)]
pub struct Solutions {
    pub variables: Vec<String>,
    pub rows: Vec<Vec<Option<Term>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionsFormat {
    Xml,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    NTriples,
    RdfJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFormat {
    Xml,
    Csv,
}

/// A term split into the parts every results format needs.
enum Parts<'a> {
    Iri(&'a str),
    Blank(&'a str),
    Literal {
        value: &'a str,
        language: Option<&'a str>,
        datatype: Option<&'a str>,
    },
    Other(String),
}

// terms beyond the three RDF 1.1 kinds only exist with optional oxigraph features
#[allow(unreachable_patterns)]
fn parts(term: &Term) -> Parts<'_> {
    match term {
        Term::NamedNode(node) => Parts::Iri(node.as_str()),
        Term::BlankNode(node) => Parts::Blank(node.as_str()),
        Term::Literal(literal) => {
            let datatype = literal.datatype().as_str();
            Parts::Literal {
                value: literal.value(),
                language: literal.language(),
                datatype: (datatype != XSD_STRING && literal.language().is_none()).then_some(datatype),
            }
        }
        other => Parts::Other(other.to_string()),
    }
}

impl SolutionsFormat {
    pub fn write_solutions(&self, solutions: &Solutions, out: &mut dyn Write) -> io::Result<()> {
        let mut writer = SolutionsWriter::start(*self, solutions.variables.clone(), out)?;
        for row in &solutions.rows {
            writer.row(row)?;
        }
        writer.finish()
    }

    pub fn write_boolean(&self, value: bool, out: &mut dyn Write) -> io::Result<()> {
        match self {
            SolutionsFormat::Xml => {
                let mut xml = XmlWriter::new(out);
                xml.declaration()?;
                xml.start("sparql", &[("xmlns", RESULTS_NS)])?;
                xml.empty("head", &[])?;
                xml.leaf("boolean", if value { "true" } else { "false" })?;
                xml.finish()
            }
            SolutionsFormat::Json => {
                serde_json::to_writer(&mut *out, &json!({ "head": {}, "boolean": value }))?;
                Ok(())
            }
            SolutionsFormat::Csv => write!(out, "_askResult{ROW_END}{value}{ROW_END}"),
        }
    }
}

enum SolutionsSink<'w> {
    Xml(XmlWriter<'w>),
    Json { out: &'w mut dyn Write, rows: usize },
    Csv(&'w mut dyn Write),
}

/// Writes solutions one row at a time.
pub struct SolutionsWriter<'w> {
    sink: SolutionsSink<'w>,
    variables: Vec<String>,
}

impl<'w> SolutionsWriter<'w> {
    /// Writes everything up to the first row.
    pub fn start(format: SolutionsFormat, variables: Vec<String>, out: &'w mut dyn Write) -> io::Result<Self> {
        let sink = match format {
            SolutionsFormat::Xml => {
                let mut xml = XmlWriter::new(out);
                xml.declaration()?;
                xml.start("sparql", &[("xmlns", RESULTS_NS)])?;
                xml.start("head", &[])?;
                for variable in &variables {
                    xml.empty("variable", &[("name", variable.as_str())])?;
                }
                xml.end()?;
                xml.start("results", &[])?;
                SolutionsSink::Xml(xml)
            }
            SolutionsFormat::Json => {
                write!(out, "{{\"head\":{{\"vars\":")?;
                serde_json::to_writer(&mut *out, &variables)?;
                write!(out, "}},\"results\":{{\"bindings\":[")?;
                SolutionsSink::Json { out, rows: 0 }
            }
            SolutionsFormat::Csv => {
                let header: Vec<_> = variables.iter().map(|v| field(v)).collect();
                write_record(out, &header)?;
                SolutionsSink::Csv(out)
            }
        };
        Ok(Self { sink, variables })
    }

    /// `row` holds one optional term per variable, in header order.
    pub fn row(&mut self, row: &[Option<Term>]) -> io::Result<()> {
        match &mut self.sink {
            SolutionsSink::Xml(xml) => xml_row(xml, &self.variables, row),
            SolutionsSink::Json { out, rows } => {
                if *rows > 0 {
                    out.write_all(b",")?;
                }
                *rows += 1;
                let mut binding = Map::new();
                for (variable, term) in self.variables.iter().zip(row) {
                    if let Some(term) = term {
                        binding.insert(variable.clone(), term_json(term));
                    }
                }
                serde_json::to_writer(&mut **out, &binding)?;
                Ok(())
            }
            SolutionsSink::Csv(out) => {
                let cells: Vec<String> = row
                    .iter()
                    .map(|term| match term.as_ref().map(parts) {
                        None => String::new(),
                        Some(Parts::Iri(iri)) => field(iri).into_owned(),
                        Some(Parts::Blank(id)) => format!("_:{id}"),
                        Some(Parts::Literal { value, .. }) => field(value).into_owned(),
                        Some(Parts::Other(text)) => field(&text).into_owned(),
                    })
                    .collect();
                write_record(&mut **out, &cells)
            }
        }
    }

    pub fn finish(self) -> io::Result<()> {
        match self.sink {
            SolutionsSink::Xml(xml) => xml.finish(),
            SolutionsSink::Json { out, .. } => {
                write!(out, "]}}}}")?;
                out.flush()
            }
            SolutionsSink::Csv(out) => out.flush(),
        }
    }
}

fn xml_row(xml: &mut XmlWriter<'_>, variables: &[String], row: &[Option<Term>]) -> io::Result<()> {
    xml.start("result", &[])?;
    for (variable, term) in variables.iter().zip(row) {
        let Some(term) = term else { continue };
        xml.start("binding", &[("name", variable.as_str())])?;
        match parts(term) {
            Parts::Iri(iri) => xml.leaf("uri", iri)?,
            Parts::Blank(id) => xml.leaf("bnode", id)?,
            Parts::Literal {
                value,
                language: Some(language),
                ..
            } => {
                xml.start("literal", &[("xml:lang", language)])?;
                xml.text(value)?;
                xml.end()?;
            }
            Parts::Literal {
                value,
                datatype: Some(datatype),
                ..
            } => {
                xml.start("literal", &[("datatype", datatype)])?;
                xml.text(value)?;
                xml.end()?;
            }
            Parts::Literal { value, .. } => xml.leaf("literal", value)?,
            Parts::Other(text) => xml.leaf("literal", &text)?,
        }
        xml.end()?;
    }
    xml.end()
}

fn term_json(term: &Term) -> Value {
    match parts(term) {
        Parts::Iri(iri) => json!({ "type": "uri", "value": iri }),
        Parts::Blank(id) => json!({ "type": "bnode", "value": id }),
        Parts::Literal {
            value,
            language,
            datatype,
        } => {
            let mut object = Map::new();
            object.insert("type".into(), json!("literal"));
            object.insert("value".into(), json!(value));
            if let Some(language) = language {
                object.insert("xml:lang".into(), json!(language));
            }
            if let Some(datatype) = datatype {
                object.insert("datatype".into(), json!(datatype));
            }
            Value::Object(object)
        }
        Parts::Other(text) => json!({ "type": "literal", "value": text }),
    }
}

impl GraphFormat {
    /// Whether triples can be written as they are produced.
    pub fn streams(&self) -> bool {
        matches!(self, GraphFormat::NTriples)
    }

    pub fn write(&self, triples: &[Triple], out: &mut dyn Write) -> io::Result<()> {
        let mut writer = GraphWriter::start(*self, out);
        for triple in triples {
            writer.triple(triple)?;
        }
        writer.finish()
    }
}

/// Writes triples one at a time. RDF/JSON groups by subject, so it
/// holds the graph until `finish`.
pub struct GraphWriter<'w> {
    out: &'w mut dyn Write,
    grouped: Option<Map<String, Value>>,
}

impl<'w> GraphWriter<'w> {
    pub fn start(format: GraphFormat, out: &'w mut dyn Write) -> Self {
        let grouped = match format {
            GraphFormat::NTriples => None,
            GraphFormat::RdfJson => Some(Map::new()),
        };
        Self { out, grouped }
    }

    pub fn triple(&mut self, triple: &Triple) -> io::Result<()> {
        let Some(graph) = self.grouped.as_mut() else {
            return writeln!(self.out, "{triple} .");
        };
        let subject = match parts(&Term::from(triple.subject.clone())) {
            Parts::Iri(iri) => iri.to_string(),
            Parts::Blank(id) => format!("_:{id}"),
            Parts::Literal { value, .. } => value.to_string(),
            Parts::Other(text) => text,
        };
        let predicates = graph
            .entry(subject)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(predicates) = predicates {
            let objects = predicates
                .entry(triple.predicate.as_str().to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(objects) = objects {
                objects.push(rdf_json_object(&triple.object));
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<()> {
        if let Some(graph) = self.grouped.take() {
            serde_json::to_writer(&mut *self.out, &graph)?;
        }
        self.out.flush()
    }
}

fn rdf_json_object(term: &Term) -> Value {
    match parts(term) {
        Parts::Iri(iri) => json!({ "type": "uri", "value": iri }),
        Parts::Blank(id) => json!({ "type": "bnode", "value": format!("_:{id}") }),
        Parts::Literal {
            value,
            language,
            datatype,
        } => {
            let mut object = Map::new();
            object.insert("type".into(), json!("literal"));
            object.insert("value".into(), json!(value));
            if let Some(language) = language {
                object.insert("lang".into(), json!(language));
            }
            if let Some(datatype) = datatype {
                object.insert("datatype".into(), json!(datatype));
            }
            Value::Object(object)
        }
        Parts::Other(text) => json!({ "type": "literal", "value": text }),
    }
}

impl UpdateFormat {
    pub fn write(&self, statement: &str, out: &mut dyn Write) -> io::Result<()> {
        match self {
            UpdateFormat::Xml => {
                let mut xml = XmlWriter::new(out);
                xml.declaration()?;
                xml.start("sparql", &[("xmlns", UPDATE_NS)])?;
                xml.empty("head", &[("statement", statement)])?;
                xml.empty("update", &[("success", "true")])?;
                xml.finish()
            }
            UpdateFormat::Csv => write!(out, "statement,success{ROW_END}{},true", quote(statement)),
        }
    }
}
