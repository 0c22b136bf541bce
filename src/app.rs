//! Application builder.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use tracing::{Instrument, info_span};

use crate::boundary::{ErrorBoundary, default_boundary};
use crate::body::ResponseBody;
use crate::context::Context;
use crate::dispatch::Pipeline;
use crate::error::{BoxError, Error, HandlerError};
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;
use crate::router::RouteTable;
use crate::server::Server;

/// An application: middleware chain, route table and error boundary.
///
/// Build it once at startup, then hand it to [`Server::serve`] or call
/// [`App::listen`]. Nothing can be registered once it is serving.
///
/// ```rust,no_run
/// use spry::{App, Context, Flow};
///
/// # async fn run() -> Result<(), spry::Error> {
/// App::new()
///     .middleware(spry::middleware::parse_json)
///     .get("/users/:id", get_user)
///     .listen(3000, |addr| println!("listening on {addr}"))
///     .await
/// # }
///
/// async fn get_user(cx: Context) -> Flow {
///     let id = cx.req.param("id").unwrap_or_default().to_owned();
///     cx.json(&serde_json::json!({ "id": id }))
/// }
/// ```
pub struct App {
    middleware: Vec<BoxedHandler>,
    routes: RouteTable,
    boundary: ErrorBoundary,
}

impl App {
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
            routes: RouteTable::new(),
            boundary: Arc::new(default_boundary),
        }
    }

    /// Appends a middleware. Middlewares run in the order they are added,
    /// before any route.
    pub fn middleware(mut self, handler: impl Handler) -> Self {
        self.middleware.push(handler.into_boxed_handler());
        self
    }

    /// Registers a route. Returns `self` for chaining.
    ///
    /// `method` is matched case-insensitively; `template` uses `:name`
    /// placeholders. Routes are tried in registration order.
    ///
    /// # Panics
    ///
    /// Panics if `template` cannot be compiled. Use [`App::try_route`] to
    /// handle that case yourself.
    pub fn route(self, method: &str, template: &str, handler: impl Handler) -> Self {
        self.try_route(method, template, handler)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_route(mut self, method: &str, template: &str, handler: impl Handler) -> Result<Self, Error> {
        self.routes.register(method, template, handler)?;
        Ok(self)
    }

    pub fn get(self, template: &str, handler: impl Handler) -> Self {
        self.route("get", template, handler)
    }

    pub fn post(self, template: &str, handler: impl Handler) -> Self {
        self.route("post", template, handler)
    }

    pub fn put(self, template: &str, handler: impl Handler) -> Self {
        self.route("put", template, handler)
    }

    pub fn patch(self, template: &str, handler: impl Handler) -> Self {
        self.route("patch", template, handler)
    }

    pub fn delete(self, template: &str, handler: impl Handler) -> Self {
        self.route("delete", template, handler)
    }

    /// Replaces the error boundary.
    pub fn error_boundary<F>(mut self, boundary: F) -> Self
    where
        F: Fn(&HandlerError, &Request, &mut Response) + Send + Sync + 'static,
    {
        self.boundary = Arc::new(boundary);
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Runs one request through middlewares, routing and the error boundary.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<ResponseBody>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let span = info_span!("request", method = %req.method(), path = %req.uri().path());
        let pipeline = Pipeline {
            middleware: &self.middleware,
            routes: &self.routes,
            boundary: &self.boundary,
        };
        let cx = Context::new(Request::from_http(req), Response::new());
        pipeline.run(cx).instrument(span).await.res.into_http()
    }

    /// Serves on `0.0.0.0:port`, calling `on_ready` with the bound address
    /// once the listener is up. Returns after a graceful shutdown.
    pub async fn listen<F>(self, port: u16, on_ready: F) -> Result<(), Error>
    where
        F: FnOnce(SocketAddr),
    {
        Server::bind(([0, 0, 0, 0], port)).serve_with(self, on_ready).await
    }
}

impl Default for App {
    fn default() -> Self { Self::new() }
}
