//! Core error types.

use thiserror::Error;

/// Core engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Request construction error.
    #[error("request error: {0}")]
    Request(#[from] pathquery_proto::Error),

    /// A path segment names no field of the entity it is applied to.
    #[error("cannot resolve '{segment}' in path '{path}': {reason}")]
    PathResolution {
        path: String,
        segment: String,
        reason: String,
    },

    /// A literal could not be converted to the declared field type.
    #[error("cannot coerce {value} to {target}")]
    TypeCoercion { value: String, target: String },

    /// The backend failed to execute a compiled query.
    #[error("query execution failed: {0}")]
    Execution(String),

    /// Entity type is not defined in the schema.
    #[error("unknown entity type: {0}")]
    UnknownEntity(String),

    /// Schema definition is inconsistent.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    pub(crate) fn path(
        path: impl Into<String>,
        segment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::PathResolution {
            path: path.into(),
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn coercion(value: impl ToString, target: impl ToString) -> Self {
        Error::TypeCoercion {
            value: value.to_string(),
            target: target.to_string(),
        }
    }
}
