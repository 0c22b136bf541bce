//! Handler trait and type erasure.
//!
//! Middlewares and routes share one contract: an async function that takes
//! the request's [`Context`] by value and hands it back inside a [`Flow`].
//!
//! ```text
//! async fn auth(cx: Context) -> Flow { … }   ← user writes this
//!        ↓ app.middleware(auth)
//! auth.into_boxed_handler()                  ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(auth))                  ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(cx)  at request time          ← one vtable dispatch
//!        ↓
//! Box::pin(auth(cx))                         ← BoxFuture
//! ```
//!
//! Because the context moves into the handler and can only come back out
//! through [`Context::next`], [`Context::fail`] or [`Context::end`], every
//! handler invokes its continuation exactly once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::{Context, Flow};

/// A heap-allocated, type-erased future that resolves to a [`Flow`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Flow> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, cx: Context) -> BoxFuture;
}

/// A type-erased handler shared by every request in flight.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid middleware and route handler.
///
/// Satisfied automatically by any function or closure shaped like
///
/// ```text
/// async fn name(cx: Context) -> Flow
/// ```
///
/// and by the built-in [`middleware`](crate::middleware) types. The trait is
/// sealed: only this crate can add implementations.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

pub(crate) mod private {
    pub trait Sealed {}
}

impl<F, Fut> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Flow> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Holds a concrete handler `F` and bridges it to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Flow> + Send + 'static,
{
    fn call(&self, cx: Context) -> BoxFuture {
        Box::pin((self.0)(cx))
    }
}
