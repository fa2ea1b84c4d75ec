use crate::config::ConfigError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Top-level error type for the keyhive library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid key path: '{0}'")]
    InvalidPath(String),

    #[error("store error: {0}")]
    Provider(#[from] ProviderError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("registry requires a store provider")]
    MissingProvider,
}
