//! Error types for Hush Core.

use thiserror::Error;

/// Core error type for Hush operations.
#[derive(Debug, Error)]
pub enum HushError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registry error passthrough.
    #[error("Registry error: {0}")]
    Registry(#[from] hush_registry::RegistryError),

    /// Guard error passthrough.
    #[error("Guard error: {0}")]
    Guard(#[from] hush_guard::GuardError),
}
