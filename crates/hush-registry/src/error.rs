//! Error types for the registry crate.

use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised while editing a connection pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler with this name is already installed.
    #[error("handler '{0}' is already installed")]
    DuplicateStage(String),

    /// The handler to insert before does not exist.
    #[error("anchor handler '{0}' not found")]
    MissingAnchor(String),

    /// The channel closed before or during the edit.
    #[error("channel is closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_handler() {
        let err = RegistryError::DuplicateStage("hush_interceptor".to_string());
        assert_eq!(err.to_string(), "handler 'hush_interceptor' is already installed");

        let err = RegistryError::MissingAnchor("packet_handler".to_string());
        assert!(err.to_string().contains("packet_handler"));
    }
}
