//! Error types for snapshot persistence.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur reading or writing the snapshot.
///
/// A missing snapshot is not an error; reads report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}
