use std::time::Duration;

use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request URI: {0}")]
    InvalidUri(String),
    #[error("unsupported URI scheme: {0}")]
    UnsupportedScheme(String),
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: &'static str },
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    Parse(#[from] ParseError),
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),
}
