pub mod csv;
pub mod types;
pub mod xml;

pub use types::StatusCode;
pub use xml::XmlWriter;
