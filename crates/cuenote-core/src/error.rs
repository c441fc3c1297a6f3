//! Engine error taxonomy.

use thiserror::Error;

use crate::model::{AnnotationStatus, InvalidTransition, ParseEnumError};
use crate::storage::StorageError;

/// Errors surfaced by engine operations. Everything is synchronous and
/// recoverable; the engine never panics the host over bad input.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine is not initialized")]
    NotInitialized,

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("permission denied: {action}")]
    PermissionDenied { action: &'static str },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: AnnotationStatus,
        to: AnnotationStatus,
    },

    #[error("unsupported interchange format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub(crate) fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }
}

impl From<InvalidTransition> for EngineError {
    fn from(err: InvalidTransition) -> Self {
        Self::InvalidStatusTransition {
            from: err.from,
            to: err.to,
        }
    }
}

impl From<ParseEnumError> for EngineError {
    fn from(err: ParseEnumError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
