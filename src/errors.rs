//! Error types for the request logging pipeline
//!
//! Configuration problems are fatal at construction time; everything that can
//! go wrong while a request is in flight is either captured into the emitted
//! event or re-raised to the caller unchanged.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A shareable, dynamically typed error captured into a log event.
///
/// Stored behind an `Arc` so the same error object can be attached to the
/// emitted event and still be re-raised to the outer pipeline.
pub type CapturedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Boxed error returned by enrichment hooks and the logging bootstrap.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Construction-time configuration errors.
///
/// These must prevent the pipeline from starting; they are never produced
/// while a request is in flight.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("message template must not be empty")]
    MissingMessageTemplate,

    #[error("invalid message template: {message}")]
    InvalidMessageTemplate { message: String },

    #[error("shared log target is already configured")]
    SharedTargetAlreadySet,
}

/// Error raised by a downstream request handler.
///
/// Wraps the underlying error in a [`CapturedError`] so the middleware can
/// attach it to the completion event and still propagate the identical error
/// object up the pipeline.
#[derive(Debug, Clone)]
pub struct HandlerError {
    inner: CapturedError,
}

impl HandlerError {
    /// Wrap a concrete error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Wrap an already-shared error without another allocation.
    pub fn from_arc(error: CapturedError) -> Self {
        Self { inner: error }
    }

    /// Create a handler error from a plain message.
    pub fn msg<M: Into<String>>(message: M) -> Self {
        Self {
            inner: Arc::new(Message(message.into())),
        }
    }

    /// Clone the shared underlying error.
    pub fn shared(&self) -> CapturedError {
        Arc::clone(&self.inner)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

#[derive(Error, Debug)]
#[error("{0}")]
struct Message(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_shares_the_same_object() {
        let error = HandlerError::msg("boom");
        let shared = error.shared();
        assert_eq!(shared.to_string(), "boom");
        assert_eq!(error.to_string(), "boom");
        // Both handles point at the same allocation.
        assert!(Arc::ptr_eq(&shared, &error.shared()));
    }

    #[test]
    fn handler_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let error = HandlerError::new(io);
        let source = std::error::Error::source(&error).expect("source");
        assert_eq!(source.to_string(), "disk gone");
    }
}
