//! Server error types.

use thiserror::Error;

/// Errors raised while running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address could not be parsed.
    #[error("Invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Failed to bind to the configured address.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to register OS signal handlers.
    #[error("Failed to register signal handler: {0}")]
    Signal(#[source] std::io::Error),

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
