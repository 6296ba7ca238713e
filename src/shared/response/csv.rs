use std::borrow::Cow;
use std::io::{self, Write};

pub const ROW_END: &str = "\r\n";

/// Encloses text in double quotes, doubling embedded quotes.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Quotes text only when it holds a separator, a quote or a line break.
pub fn field(text: &str) -> Cow<'_, str> {
    if text.contains([',', '"', '\r', '\n']) {
        Cow::Owned(quote(text))
    } else {
        Cow::Borrowed(text)
    }
}

/// Writes already rendered cells as one CRLF terminated record.
pub fn write_record<S: AsRef<str>>(out: &mut dyn Write, cells: &[S]) -> io::Result<()> {
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            out.write_all(b",")?;
        }
        out.write_all(cell.as_ref().as_bytes())?;
    }
    out.write_all(ROW_END.as_bytes())
}
