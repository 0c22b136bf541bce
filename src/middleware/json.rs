use tracing::debug;

use crate::context::{Context, Flow};
use crate::error::HandlerError;

/// Parses `application/json` request bodies.
///
/// The parsed value is stored with [`Request::set_body`](crate::Request::set_body).
/// Requests with any other content type, or with an empty body, pass through
/// untouched. Malformed JSON fails the chain with `400 Bad Request`.
pub async fn parse_json(mut cx: Context) -> Flow {
    if !is_json(cx.req.header("content-type")) {
        return cx.next();
    }

    let bytes = match cx.req.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return cx.fail(e),
    };
    if bytes.is_empty() {
        return cx.next();
    }

    match serde_json::from_slice(&bytes) {
        Ok(value) => {
            debug!(len = bytes.len(), "parsed JSON body");
            cx.req.set_body(value);
            cx.next()
        }
        Err(e) => cx.fail(HandlerError::bad_request("invalid JSON body").with_source(e)),
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
