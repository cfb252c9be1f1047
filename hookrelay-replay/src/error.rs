use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid destination URL {url:?}: {source}")]
    InvalidDestination {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
