use stargazer_api::GitHubError;
use stargazer_cache::CacheError;
use thiserror::Error;

/// Everything that can go wrong while building the list
///
/// `Transport`, `Decode` and `Timeout` come from the remote feed. `StorageCorrupt`
/// is recovered inside the favorites source and only shows up in logs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Request timed out")]
    Timeout,

    #[error("No internet connection")]
    Offline,

    #[error("Favorites storage is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Storage operation failed: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<GitHubError> for Error {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Timeout => Error::Timeout,
            GitHubError::ParseError(e) => Error::Decode(e.to_string()),
            other => Error::Transport(other.to_string()),
        }
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Self {
        Error::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::StorageCorrupt(err.to_string())
    }
}
