//! Semantic error types for the language server.
//!
//! Failures that stop a request or the server itself live here. Indexing
//! failures are scoped to single files and have their own error types in
//! [`crate::indexing`].

use thiserror::Error;

/// Errors that can occur during language server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Server received a duplicate initialisation request.
    #[error("server already initialised")]
    AlreadyInitialised,

    /// An invalid configuration value was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Client-supplied index settings could not be deserialised.
    #[error("invalid index settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON-RPC main loop stopped on a transport or protocol error.
    #[error("language server main loop failed: {0}")]
    MainLoop(#[from] async_lsp::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_and_config_errors_display_their_context() {
        assert_eq!(
            ServerError::AlreadyInitialised.to_string(),
            "server already initialised"
        );
        assert_eq!(
            ServerError::InvalidConfig("poll interval must be positive".to_string()).to_string(),
            "invalid configuration: poll interval must be positive"
        );
    }

    #[test]
    fn settings_error_converts_from_serde_json() {
        let json_err = serde_json::from_str::<Vec<String>>("{").err();
        let error = json_err.map(ServerError::from);
        assert!(error.is_some_and(|e| e.to_string().starts_with("invalid index settings")));
    }

    #[test]
    fn stdio_failures_convert_into_io_errors() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed");
        let error = ServerError::from(io_err);
        assert!(matches!(error, ServerError::Io(_)));
        assert_eq!(error.to_string(), "I/O error: stdout closed");
    }
}
