//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic input failures only (validation, malformed identifiers).
/// Authentication and crypto failures have their own types in `lorecraft-auth`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more input fields failed validation.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Collect validation problems; `Ok(())` when there are none.
    pub fn check(problems: Vec<String>) -> DomainResult<()> {
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(problems))
        }
    }
}
