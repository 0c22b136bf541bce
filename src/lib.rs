//! # spry
//!
//! A minimal HTTP framework on top of hyper: ordered middleware, routes with
//! named segments, and one error boundary per application.
//!
//! ## The model
//!
//! Every request becomes a [`Context`] (an augmented [`Request`] plus a
//! [`Response`] under construction) and walks a fixed pipeline:
//!
//! 1. Middlewares, in registration order, each exactly once.
//! 2. Routing: the first route registered for the method whose template
//!    matches the path. No match is a `404` with
//!    `{"error": "Cannot find GET /path"}`.
//! 3. The route handler.
//!
//! Each step hands the context back through a continuation:
//! [`Context::next`] to go on, [`Context::fail`] to jump to the error
//! boundary, [`Context::end`] to stop (for example after serving a file).
//!
//! What spry leaves to hyper or to a proxy in front of it: HTTP parsing, TLS,
//! body-size limits, rate limiting.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use spry::{App, Context, Flow, HandlerError, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), spry::Error> {
//!     App::new()
//!         .middleware(spry::middleware::parse_json)
//!         .middleware(require_token)
//!         .get("/users/:id", get_user)
//!         .listen(3000, |addr| println!("listening on {addr}"))
//!         .await
//! }
//!
//! async fn require_token(cx: Context) -> Flow {
//!     if cx.req.header("authorization").is_none() {
//!         return cx.fail(HandlerError::unauthorized("Unauthorized"));
//!     }
//!     cx.next()
//! }
//!
//! async fn get_user(mut cx: Context) -> Flow {
//!     let id = cx.req.param("id").unwrap_or_default().to_owned();
//!     cx.res.status(StatusCode::OK);
//!     cx.json(&serde_json::json!({ "id": id }))
//! }
//! ```

mod app;
mod body;
mod boundary;
mod context;
mod dispatch;
mod error;
mod handler;
mod pattern;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use app::App;
pub use body::ResponseBody;
pub use boundary::{ErrorBoundary, default_boundary};
pub use context::{Context, Flow};
pub use error::{BoxError, Error, HandlerError};
pub use handler::Handler;
pub use http::{self, StatusCode};
pub use pattern::PathPattern;
pub use request::{Request, RequestBody};
pub use response::Response;
pub use router::{RouteMatch, RouteTable};
pub use server::Server;
