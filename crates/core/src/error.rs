//! Errors raised by marketplace aggregates and value objects.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A business rule refused the command.
///
/// Storage and lock failures never show up here; each service wraps this in
/// its own error next to a storage variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad input: a blank field, a zero quantity, a rate above 100 %.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The command would break a rule of the aggregate, such as reserving
    /// more units than are available or overflowing a money amount.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An id or document number that does not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The aggregate was never created (a listing never submitted, a stock
    /// record never opened).
    #[error("{0} not found")]
    NotFound(String),

    /// Creating something that already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_rule() {
        assert_eq!(
            DomainError::not_found("stock record").to_string(),
            "stock record not found"
        );
        assert_eq!(
            DomainError::validation("quantity must be positive").to_string(),
            "validation failed: quantity must be positive"
        );
    }
}
