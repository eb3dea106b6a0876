//! Error types for Stitch.
//!
//! [`ChainError`] is the value a handler chain carries while it is in error
//! mode. Handlers produce it by returning `Err` (usually through `?`), by
//! calling `next.fail(..)`, or by panicking. [`ResponseError`] reports misuse
//! of a [`Response`](crate::Response) writer.

use thiserror::Error;

/// A boxed, thread-safe error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while writing a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// The response was already ended; the write was discarded.
    #[error("response already finished")]
    AlreadyFinished,

    /// Status or headers were modified after the first body write.
    #[error("cannot modify {0} after headers are sent")]
    HeadersSent(&'static str),

    /// The header name is not a valid HTTP header name.
    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),

    /// The header value contains bytes that are not allowed.
    #[error("invalid header value for {name}")]
    InvalidHeaderValue {
        /// The header the value was meant for.
        name: String,
    },
}

/// The error propagated through a handler chain.
///
/// Any error type can be turned into a `ChainError` with [`ChainError::new`];
/// `anyhow::Error`, `std::io::Error`, [`ResponseError`] and strings convert
/// through `From`, so `?` works inside handlers for the common cases.
///
/// # Example
///
/// ```
/// use stitch_core::ChainError;
///
/// let err = ChainError::msg("database unavailable");
/// assert_eq!(err.message(), "database unavailable");
/// assert!(!err.is_panic());
/// ```
#[derive(Error, Debug)]
pub enum ChainError {
    /// An ad-hoc error carrying only a message.
    #[error("{0}")]
    Message(String),

    /// An error returned by a handler.
    #[error(transparent)]
    Handler(BoxError),

    /// A handler panicked; the payload is rendered as text.
    #[error("handler panicked: {0}")]
    Panic(String),

    /// A response write failed.
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl ChainError {
    /// Wraps any error type.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(Box::new(error))
    }

    /// Creates an error from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Creates an error from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panic(message)
    }

    /// Returns the human-readable message of this error.
    ///
    /// For a panic this is the panic payload, without the "handler panicked"
    /// prefix used by `Display`.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Message(message) | Self::Panic(message) => message.clone(),
            Self::Handler(source) => source.to_string(),
            Self::Response(source) => source.to_string(),
        }
    }

    /// Returns `true` if this error was produced by a caught panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }

    /// Attempts to view the wrapped handler error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Handler(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ChainError {
    fn from(error: anyhow::Error) -> Self {
        Self::Handler(error.into())
    }
}

impl From<std::io::Error> for ChainError {
    fn from(error: std::io::Error) -> Self {
        Self::new(error)
    }
}

impl From<BoxError> for ChainError {
    fn from(error: BoxError) -> Self {
        Self::Handler(error)
    }
}

impl From<String> for ChainError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for ChainError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("quota exceeded for {0}")]
    struct QuotaError(&'static str);

    #[test]
    fn test_message_error() {
        let err = ChainError::msg("boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn test_wrapped_error_keeps_display_and_type() {
        let err = ChainError::new(QuotaError("tenant-a"));
        assert_eq!(err.message(), "quota exceeded for tenant-a");
        assert!(err.downcast_ref::<QuotaError>().is_some());
        assert!(err.downcast_ref::<std::io::Error>().is_none());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: ChainError = anyhow::anyhow!("from anyhow").into();
        assert_eq!(err.message(), "from anyhow");
    }

    #[test]
    fn test_panic_payloads() {
        let static_payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        let err = ChainError::from_panic(static_payload.as_ref());
        assert!(err.is_panic());
        assert_eq!(err.message(), "static str");
        assert_eq!(err.to_string(), "handler panicked: static str");

        let owned_payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(ChainError::from_panic(owned_payload.as_ref()).message(), "owned");

        let odd_payload: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert_eq!(
            ChainError::from_panic(odd_payload.as_ref()).message(),
            "unknown panic payload"
        );
    }

    #[test]
    fn test_response_error_display() {
        assert_eq!(
            ResponseError::AlreadyFinished.to_string(),
            "response already finished"
        );
        assert_eq!(
            ResponseError::HeadersSent("status").to_string(),
            "cannot modify status after headers are sent"
        );
        let err: ChainError = ResponseError::AlreadyFinished.into();
        assert_eq!(err.message(), "response already finished");
    }
}
