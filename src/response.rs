//! Outgoing HTTP response type.
//!
//! A [`Response`] is a mutable builder owned by one request. Handlers set a
//! status, append serialized values, or attach a file; the dispatcher turns
//! the result into an [`http::Response`] once the pipeline is done.
//!
//! Once a response is finished (after [`Response::json`] or
//! [`Response::send_file`]) every further write is ignored and logged.

use std::io;
use std::path::Path;

use bytes::BytesMut;
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use tokio::fs::File;
use tracing::warn;

use crate::body::{FileBody, ResponseBody};
use crate::error::HandlerError;

/// An outgoing HTTP response.
///
/// ```rust
/// use spry::{Context, Flow, StatusCode};
///
/// async fn create_user(mut cx: Context) -> Flow {
///     cx.res
///         .status(StatusCode::CREATED)
///         .header(spry::http::header::LOCATION, "/users/99".parse().unwrap());
///     cx.json(&serde_json::json!({ "id": "99" }))
/// }
/// ```
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    buffer: BytesMut,
    file: Option<FileBody>,
    finished: bool,
}

impl Response {
    pub(crate) fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            buffer: BytesMut::new(),
            file: None,
            finished: false,
        }
    }

    /// Sets the status code. Returns `self` for chaining.
    pub fn status(&mut self, code: StatusCode) -> &mut Self {
        if self.writable("status") {
            self.status = code;
        }
        self
    }

    pub fn status_code(&self) -> StatusCode { self.status }

    /// Sets a header, replacing any previous value. Returns `self` for chaining.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if self.writable("header") {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Whether the response has been finished by `json` or `send_file`.
    pub fn is_finished(&self) -> bool { self.finished }

    /// Serializes `value` as JSON and appends it to the body without
    /// finishing the response. `content-length` tracks the buffered bytes.
    pub fn send<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, HandlerError> {
        if !self.writable("send") {
            return Ok(self);
        }
        let bytes = serde_json::to_vec(value)?;
        self.buffer.extend_from_slice(&bytes);
        self.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.buffer.len()));
        Ok(self)
    }

    /// Sends `value` as `application/json` and finishes the response.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), HandlerError> {
        if !self.writable("json") {
            return Ok(());
        }
        self.send(value)?;
        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.finished = true;
        Ok(())
    }

    /// Opens the file at `path` and streams it as the rest of the body.
    ///
    /// An open failure is returned to the caller. Read failures after this
    /// point are logged by the body stream and abort the transfer; the
    /// handle is closed either way.
    pub async fn send_file(&mut self, path: impl AsRef<Path>, content_type: &str) -> io::Result<()> {
        if !self.writable("send_file") {
            return Ok(());
        }
        let path = path.as_ref();
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let file = File::open(path).await?;

        self.headers.insert(header::CONTENT_TYPE, content_type);
        self.headers.remove(header::CONTENT_LENGTH);
        self.file = Some(FileBody::new(file, path.to_owned()));
        self.finished = true;
        Ok(())
    }

    pub(crate) fn into_http(self) -> http::Response<ResponseBody> {
        let head = self.buffer.freeze();
        let body = match self.file {
            Some(file) => ResponseBody::with_file(head, file),
            None => ResponseBody::once(head),
        };
        let mut res = http::Response::new(body);
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }

    /// Returns `true` when writing is still allowed.
    fn writable(&self, op: &'static str) -> bool {
        if self.finished {
            warn!(op, "write after the response was finished, ignoring");
        }
        !self.finished
    }
}
