pub mod accept;
pub mod media_type;
pub mod resolver;

pub use accept::parse_accept;
pub use media_type::{MediaType, MediaTypeError, types};
pub use resolver::{Selection, TypeMatchingResolver};

#[cfg(test)]
mod media_type_test;
