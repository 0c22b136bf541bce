//! Request dispatch.
//!
//! One request moves through an explicit state machine:
//!
//! ```text
//! Middleware(0) → Middleware(1) → … → Middleware(n) → Routing → Handling → Done
//!        │               │                              │          │
//!        └───────────────┴─── fail(e) ──→ Failed(e) ────┼──────────┘
//!                                            │          └─ no match → 404 → Done
//!                                            └─ error boundary → Done
//! ```
//!
//! [`Pipeline::run`] drives it with a flat loop over [`Pipeline::advance`],
//! so a long middleware chain never deepens the call stack.

use http::StatusCode;
use http::header::{self, HeaderValue};
use tracing::{debug, error};

use crate::boundary::{ErrorBody, ErrorBoundary};
use crate::context::{Context, Flow, Step};
use crate::error::HandlerError;
use crate::handler::BoxedHandler;
use crate::router::RouteTable;

enum State {
    Middleware(usize),
    Routing,
    Handling(BoxedHandler),
    Failed(HandlerError),
    Done,
}

/// Borrowed view of an app's immutable dispatch tables.
pub(crate) struct Pipeline<'a> {
    pub middleware: &'a [BoxedHandler],
    pub routes: &'a RouteTable,
    pub boundary: &'a ErrorBoundary,
}

impl Pipeline<'_> {
    /// Runs `cx` to completion and returns it with the final response state.
    pub(crate) async fn run(&self, mut cx: Context) -> Context {
        let mut state = State::Middleware(0);
        loop {
            if matches!(state, State::Done) {
                return cx;
            }
            (state, cx) = self.advance(state, cx).await;
        }
    }

    async fn advance(&self, state: State, mut cx: Context) -> (State, Context) {
        match state {
            State::Middleware(i) => match self.middleware.get(i) {
                Some(middleware) => {
                    debug!(index = i, "middleware");
                    resolve(middleware.call(cx).await, State::Middleware(i + 1))
                }
                None => (State::Routing, cx),
            },

            State::Routing => {
                match self.routes.lookup(cx.req.method().as_str(), cx.req.path()) {
                    Some(matched) => {
                        debug!(route = %matched.template, "route matched");
                        cx.req.set_params(matched.params);
                        (State::Handling(matched.handler), cx)
                    }
                    None => {
                        not_found(&mut cx);
                        (State::Done, cx)
                    }
                }
            }

            State::Handling(handler) => resolve(handler.call(cx).await, State::Done),

            State::Failed(err) => {
                debug!(error = %err, "forwarding to error boundary");
                cx.res.header(header::CONNECTION, HeaderValue::from_static("close"));
                (self.boundary)(&err, &cx.req, &mut cx.res);
                (State::Done, cx)
            }

            State::Done => (State::Done, cx),
        }
    }
}

/// Maps a step's continuation onto the next state.
fn resolve(flow: Flow, on_next: State) -> (State, Context) {
    match flow.0 {
        Step::Next(cx) => (on_next, cx),
        Step::Fail(cx, err) => (State::Failed(err), cx),
        Step::End(cx) => (State::Done, cx),
    }
}

fn not_found(cx: &mut Context) {
    debug!("no route matched");
    let message = format!("Cannot find {} {}", cx.req.method(), cx.req.path_and_query());
    if let Err(e) = cx.res.status(StatusCode::NOT_FOUND).json(&ErrorBody { error: &message }) {
        error!("failed to write 404 response: {e}");
    }
}
