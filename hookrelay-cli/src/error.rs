use std::path::PathBuf;

use hookrelay_replay::ReplayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("No redirect URL configured")]
    MissingRedirectUrl,
    #[error("Request data is required")]
    MissingRequestData,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Replay(#[from] ReplayError),
}
