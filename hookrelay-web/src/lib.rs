mod client;
mod error;
mod parser;
mod request;
#[cfg(test)]
mod request_test;
mod response;

pub use client::{Client, ClientConfig};
pub use error::RequestError;
pub use parser::{Limits, ParseError, ParseErrorKind};
pub use request::{Header, Request, RequestBuilder};
pub use response::Response;
