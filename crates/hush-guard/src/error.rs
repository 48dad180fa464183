//! Error types for the guard crate.

use thiserror::Error;

/// Result type alias for guard construction.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors raised while building a [`CauseMatcher`](crate::CauseMatcher).
#[derive(Debug, Error)]
pub enum GuardError {
    /// A reason pattern failed to compile.
    #[error("invalid reason pattern: {0}")]
    Pattern(#[from] regex::Error),
}
