//! Domain-level errors.
//!
//! These errors represent business rule violations.
//! They are independent of infrastructure concerns (HTTP, database, cache).

use thiserror::Error;

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed for a field or input
    #[error("Validation error: {0}")]
    Validation(String),
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Message suitable for returning to a client
    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation(msg) => msg,
        }
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
