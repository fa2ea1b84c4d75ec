use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    PermissionDenied(String),

    #[error("node handle is no longer open")]
    HandleClosed,

    #[error("failed to read store file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write store file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse store file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize store: {0}")]
    SerializeError(#[from] toml::ser::Error),
}
