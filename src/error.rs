//! Error types.
//!
//! Two families, kept apart on purpose:
//!
//! - [`Error`] — infrastructure failures: binding a port, reading a static
//!   folder, compiling a route template. These surface from setup calls.
//! - [`HandlerError`] — application failures raised by a middleware or route
//!   through [`Context::fail`](crate::Context::fail). These are routed to the
//!   app's error boundary and turned into an HTTP response there.

use std::error::Error as StdError;

use http::StatusCode;

/// Boxed error used as the opaque `source` of a [`HandlerError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The error type returned by spry's fallible setup operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid route `{template}`: {source}")]
    InvalidRoute {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// A failure signalled by a handler.
///
/// Carries an optional HTTP status. The default error boundary answers with
/// that status and `{"error": message}`; errors without a status become
/// `500 Internal Server Error`.
///
/// ```rust
/// use spry::HandlerError;
/// use http::StatusCode;
///
/// let err = HandlerError::new(StatusCode::UNAUTHORIZED, "Unauthorized");
/// assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
/// assert_eq!(err.message(), "Unauthorized");
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    status: Option<StatusCode>,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    /// An error that maps to `status` with `message` as the client-facing text.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status: Some(status), message: message.into(), source: None }
    }

    /// An error with no HTTP status. The client only ever sees a generic 500.
    pub fn internal(err: impl Into<BoxError>) -> Self {
        let source = err.into();
        Self { status: None, message: source.to_string(), source: Some(source) }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Attaches an underlying cause, keeping status and message.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::internal(e)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(e)
    }
}
