//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri, Version};
use http_body::Body;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use tracing::warn;

use crate::error::{BoxError, HandlerError};

/// The raw, not yet consumed request body.
pub type RequestBody = UnsyncBoxBody<Bytes, BoxError>;

/// An incoming request, wrapped with the helpers handlers rely on.
///
/// The query string is parsed once when the request arrives. Route params are
/// filled in by the dispatcher after a route matches; the parsed body is set
/// by a body-parsing middleware such as [`parse_json`](crate::middleware::parse_json).
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    query: HashMap<String, String>,
    params: HashMap<String, String>,
    locals: Extensions,
    body: Option<serde_json::Value>,
    raw_body: Option<RequestBody>,
}

impl Request {
    pub(crate) fn from_http<B>(req: http::Request<B>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let query = parse_query(parts.uri.query());
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            query,
            params: HashMap::new(),
            locals: Extensions::new(),
            body: None,
            raw_body: Some(body.map_err(Into::<BoxError>::into).boxed_unsync()),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// The request path without its query string.
    pub fn path(&self) -> &str { self.uri.path() }

    /// The request target as the client sent it, query string included.
    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query().map_or_else(|| self.uri.path(), |pq| pq.as_str())
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Query parameters. Repeated keys keep the last value.
    pub fn query(&self) -> &HashMap<String, String> { &self.query }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Route parameters; empty until a route has matched.
    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Per-request storage for passing values between middlewares and routes.
    pub fn locals(&self) -> &Extensions { &self.locals }
    pub fn locals_mut(&mut self) -> &mut Extensions { &mut self.locals }

    /// The parsed body, if a body-parsing middleware produced one.
    pub fn body(&self) -> Option<&serde_json::Value> { self.body.as_ref() }

    pub fn set_body(&mut self, body: serde_json::Value) {
        self.body = Some(body);
    }

    /// Takes the raw body stream. Returns `None` once it has been taken.
    pub fn take_raw_body(&mut self) -> Option<RequestBody> {
        self.raw_body.take()
    }

    /// Reads the whole raw body into memory.
    ///
    /// The body can be read once; later calls return an empty buffer.
    pub async fn bytes(&mut self) -> Result<Bytes, HandlerError> {
        let Some(body) = self.raw_body.take() else {
            return Ok(Bytes::new());
        };
        let collected = body.collect().await.map_err(|e| {
            HandlerError::bad_request("failed to read request body").with_source(e)
        })?;
        Ok(collected.to_bytes())
    }
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return HashMap::new();
    };
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            warn!(query, "ignoring malformed query string: {e}");
            HashMap::new()
        }
    }
}
