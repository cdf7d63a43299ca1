//! Request-level error types.

use thiserror::Error;

/// Errors raised while building a request, before anything is compiled.
#[derive(Debug, Error)]
pub enum Error {
    /// A builder that requires at least one input received none.
    #[error("empty input: {0}")]
    EmptyInput(String),
}
