//! Error boundary.
//!
//! Every error a middleware or route raises through
//! [`Context::fail`](crate::Context::fail) ends up here. Each [`App`](crate::App)
//! holds exactly one boundary; [`default_boundary`] is installed until the
//! application replaces it.

use std::error::Error as _;
use std::sync::Arc;

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::error::HandlerError;
use crate::request::Request;
use crate::response::Response;

/// The terminal handler for forwarded errors.
pub type ErrorBoundary = Arc<dyn Fn(&HandlerError, &Request, &mut Response) + Send + Sync + 'static>;

pub(crate) const GENERIC_MESSAGE: &str = "Sorry, something unexpected happened from our side.";

/// JSON shape of every framework-generated error body.
#[derive(Serialize)]
pub(crate) struct ErrorBody<'a> {
    pub error: &'a str,
}

/// Maps errors with a status to that status and `{"error": message}`;
/// everything else becomes a logged `500` with a generic message.
pub fn default_boundary(err: &HandlerError, req: &Request, res: &mut Response) {
    let (status, message) = match err.status() {
        Some(status) => (status, err.message()),
        None => {
            error!(
                method = %req.method(),
                path = req.path(),
                source = ?err.source(),
                "unhandled error: {err}"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE)
        }
    };
    if let Err(e) = res.status(status).json(&ErrorBody { error: message }) {
        error!("failed to write error response: {e}");
    }
}
