//! Outgoing response body.
//!
//! A response body is an optional buffered chunk followed by an optional
//! streamed file. The file handle lives inside [`FileBody`] and is dropped as
//! soon as the stream ends, fails, or the transport discards the body because
//! the client went away.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::Stream;
use http_body::{Body as HttpBody, Frame, SizeHint};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

pub struct ResponseBody {
    head: Option<Bytes>,
    file: Option<FileBody>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { head: None, file: None }
    }

    pub fn once(bytes: Bytes) -> Self {
        let head = (!bytes.is_empty()).then_some(bytes);
        Self { head, file: None }
    }

    pub(crate) fn with_file(head: Bytes, file: FileBody) -> Self {
        let mut body = Self::once(head);
        body.file = Some(file);
        body
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if let Some(bytes) = this.head.take() {
            return Poll::Ready(Some(Ok(Frame::data(bytes))));
        }
        let Some(file) = this.file.as_mut() else {
            return Poll::Ready(None);
        };
        let frame = ready!(Pin::new(file).poll_frame(cx));
        if !matches!(frame, Some(Ok(_))) {
            // Ended or failed: release the file handle now.
            this.file = None;
        }
        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.head.is_none() && self.file.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        match (&self.head, &self.file) {
            (None, None) => SizeHint::with_exact(0),
            (Some(bytes), None) => SizeHint::with_exact(bytes.len() as u64),
            (head, Some(_)) => {
                let mut hint = SizeHint::new();
                hint.set_lower(head.as_ref().map_or(0, |b| b.len() as u64));
                hint
            }
        }
    }
}

/// Streams an open file to the transport.
pub(crate) struct FileBody {
    stream: ReaderStream<File>,
    path: PathBuf,
    sent: u64,
}

impl FileBody {
    pub(crate) fn new(file: File, path: PathBuf) -> Self {
        Self { stream: ReaderStream::new(file), path, sent: 0 }
    }

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<io::Result<Frame<Bytes>>>> {
        let this = self.get_mut();
        match ready!(Pin::new(&mut this.stream).poll_next(cx)) {
            Some(Ok(bytes)) => {
                this.sent += bytes.len() as u64;
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            Some(Err(e)) => {
                warn!(path = %this.path.display(), sent = this.sent, "file stream failed: {e}");
                Poll::Ready(Some(Err(e)))
            }
            None => {
                debug!(path = %this.path.display(), sent = this.sent, "file stream complete");
                Poll::Ready(None)
            }
        }
    }
}
