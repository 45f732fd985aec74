//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid {kind} id: {value}")]
    InvalidId { kind: &'static str, value: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Field {0} must be a string")]
    NotAString(&'static str),
}

impl ModelError {
    pub fn invalid_id(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidId {
            kind,
            value: value.into(),
        }
    }

    /// True if the error was caused by a malformed identifier string.
    pub fn is_invalid_id(&self) -> bool {
        matches!(self, ModelError::InvalidId { .. })
    }
}
