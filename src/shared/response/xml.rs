use std::borrow::Cow;
use std::io::{self, Write};

/// Replaces the five XML special characters with entity references.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Minimal streaming XML writer keeping a stack of open elements.
pub struct XmlWriter<'w> {
    out: &'w mut dyn Write,
    open: Vec<String>,
}

impl<'w> XmlWriter<'w> {
    pub fn new(out: &'w mut dyn Write) -> Self {
        Self {
            out,
            open: Vec::new(),
        }
    }

    pub fn declaration(&mut self) -> io::Result<()> {
        self.out
            .write_all(br#"<?xml version="1.0" encoding="UTF-8"?>"#)
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
        self.tag(name, attributes)?;
        self.out.write_all(b">")?;
        self.open.push(name.to_string());
        Ok(())
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
        self.tag(name, attributes)?;
        self.out.write_all(b"/>")
    }

    pub fn text(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(escape(text).as_bytes())
    }

    /// `<name>text</name>`
    pub fn leaf(&mut self, name: &str, text: &str) -> io::Result<()> {
        self.start(name, &[])?;
        self.text(text)?;
        self.end()
    }

    pub fn end(&mut self) -> io::Result<()> {
        match self.open.pop() {
            Some(name) => write!(self.out, "</{name}>"),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no open xml element",
            )),
        }
    }

    /// Closes every element still open.
    pub fn finish(mut self) -> io::Result<()> {
        while !self.open.is_empty() {
            self.end()?;
        }
        self.out.flush()
    }

    fn tag(&mut self, name: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
        write!(self.out, "<{name}")?;
        for (key, value) in attributes {
            write!(self.out, " {key}=\"{}\"", escape(value))?;
        }
        Ok(())
    }
}
