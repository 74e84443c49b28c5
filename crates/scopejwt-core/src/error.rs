//! Scope parsing errors.

use thiserror::Error;

/// A result type using `ScopeError`.
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Errors produced while parsing scope identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// The scope kind is not one of `default`, `website`, `group`, `store`.
    #[error("unknown scope kind: {0}")]
    UnknownKind(String),

    /// The numeric part of a scope key is not a valid id.
    #[error("invalid scope id: {0}")]
    InvalidId(String),

    /// The default scope only exists with id 0.
    #[error("default scope must have id 0, got {0}")]
    DefaultWithId(u32),
}
