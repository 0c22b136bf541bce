//! Built-in middleware.
//!
//! Middleware runs before routing and is the right place for cross-cutting
//! concerns. Everything here is an ordinary [`Handler`](crate::Handler) and is
//! registered with [`App::middleware`](crate::App::middleware):
//!
//! - [`parse_json`] — reads `application/json` bodies into [`Request::body`](crate::Request::body)
//! - [`ServeStatic`] — answers requests for files under a folder

mod json;
mod static_files;

pub use json::parse_json;
pub use static_files::{ServeStatic, ServeStaticBuilder};
