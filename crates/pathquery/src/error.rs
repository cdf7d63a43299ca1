//! Repository error types.

use thiserror::Error;

/// Repository errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the query engine or the store.
    #[error(transparent)]
    Core(#[from] pathquery_core::Error),

    /// Invalid repository configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A record was written without a usable identity.
    #[error("record for '{entity}' has no value for identity field '{field}'")]
    MissingIdentity { entity: String, field: String },
}

impl From<pathquery_proto::Error> for Error {
    fn from(e: pathquery_proto::Error) -> Self {
        Error::Core(e.into())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, Error>;
