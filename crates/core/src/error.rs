//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// These are the expected, caller-recoverable rejections of the ledger. Each one
/// carries a human-readable message. Storage and connectivity failures are not
/// domain errors and live with the infrastructure that produces them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (negative opening balance, non-positive amount, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced account does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The no-overdraft invariant would be violated.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::InsufficientFunds(msg.into())
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(msg) | Self::NotFound(msg) | Self::InsufficientFunds(msg) => msg,
        }
    }
}
