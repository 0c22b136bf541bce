//! Per-request context and the continuation that passes it on.

use std::path::Path;

use serde::Serialize;

use crate::error::HandlerError;
use crate::request::Request;
use crate::response::Response;

/// One request/response exchange.
///
/// Created when the transport hands over a request and dropped once the
/// response has been converted back for the wire. Never shared between
/// requests.
pub struct Context {
    pub req: Request,
    pub res: Response,
}

/// The outcome of one pipeline step.
///
/// Only the continuation methods on [`Context`] produce a `Flow`, and each
/// of them consumes the context.
#[must_use = "a handler must return its Flow to the dispatcher"]
pub struct Flow(pub(crate) Step);

pub(crate) enum Step {
    /// Proceed to the next middleware, or to routing.
    Next(Context),
    /// Stop the chain and hand the error to the error boundary.
    Fail(Context, HandlerError),
    /// Stop the chain; the response is sent as it stands.
    End(Context),
}

impl Context {
    pub(crate) fn new(req: Request, res: Response) -> Self {
        Self { req, res }
    }

    /// Continue with the next step of the pipeline.
    ///
    /// From a route handler this completes the exchange, same as [`end`](Self::end).
    pub fn next(self) -> Flow {
        Flow(Step::Next(self))
    }

    /// Short-circuit to the error boundary.
    pub fn fail(self, err: impl Into<HandlerError>) -> Flow {
        Flow(Step::Fail(self, err.into()))
    }

    /// Stop the chain without running anything else.
    pub fn end(self) -> Flow {
        Flow(Step::End(self))
    }

    /// Sends `value` as a JSON response and ends the chain.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Flow {
        match self.res.json(value) {
            Ok(()) => self.end(),
            Err(e) => self.fail(e),
        }
    }

    /// Streams the file at `path` as the response body and ends the chain.
    ///
    /// Failing to open the file fails the chain; faults during streaming are
    /// only logged.
    pub async fn send_file(mut self, path: impl AsRef<Path>, content_type: &str) -> Flow {
        match self.res.send_file(path, content_type).await {
            Ok(()) => self.end(),
            Err(e) => self.fail(e),
        }
    }
}
