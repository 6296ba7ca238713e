pub mod request;

pub use request::{ACCEPT_OVERRIDE, Body, NegotiationDefaults, RequestParts, parse_request};
