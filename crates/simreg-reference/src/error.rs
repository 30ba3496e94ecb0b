use std::path::PathBuf;
use thiserror::Error;

/// Errors talking to a remote reference store
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("no API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("{0} not found in remote store")]
    NotFound(String),

    #[error("invalid version manifest: {0}")]
    Manifest(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
