//! Handler traits and closure adapters.
//!
//! A chain stores two kinds of handlers:
//!
//! - [`Handler`] - a normal layer, called as `(req, res, next)`.
//! - [`ErrorHandler`] - an error layer, called as `(err, req, res, next)`.
//!
//! The kind is decided by the registration entry point, never by inspecting
//! the handler. Closures become handlers through [`handler_fn`] and
//! [`error_handler_fn`]; the chain's builder methods accept closures directly.
//!
//! # Example
//!
//! ```
//! use stitch_chain::{BoxFuture, Handler, HandlerResult, Next};
//! use stitch_core::{Request, Response};
//!
//! struct PoweredBy;
//!
//! impl Handler for PoweredBy {
//!     fn call(&self, _req: Request, res: Response, next: Next) -> BoxFuture<'static, HandlerResult> {
//!         Box::pin(async move {
//!             res.set_header("x-powered-by", "stitch")?;
//!             next.run().await;
//!             HandlerResult::Ok(())
//!         })
//!     }
//! }
//! ```

use crate::next::Next;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use stitch_core::{ChainError, Request, Response};

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler returns.
///
/// `Err` is treated exactly like calling `next.fail(err)` from the handler's
/// position, as long as the handler has not already consumed its [`Next`].
pub type HandlerResult = Result<(), ChainError>;

/// A type-erased normal handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// A type-erased error handler.
pub type BoxedErrorHandler = Arc<dyn ErrorHandler>;

/// A normal layer in a handler chain.
///
/// # Invariants
///
/// - A handler either finalizes the response, calls `next`, or drops `next`
///   to halt the walk.
/// - `next` may be called after any number of awaits, or from another task.
pub trait Handler: Send + Sync + 'static {
    /// Handles a request.
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture<'static, HandlerResult>;

    /// Returns the name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An error layer in a handler chain.
///
/// Error handlers only run while an error is pending. Calling `next.run()`
/// resolves the error and resumes normal layers after this one;
/// `next.fail(e)` keeps propagating.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Handles a pending error.
    fn call(
        &self,
        err: ChainError,
        req: Request,
        res: Response,
        next: Next,
    ) -> BoxFuture<'static, HandlerResult>;

    /// Returns the name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A [`Handler`] backed by an async closure.
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    /// Wraps a closure.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.func)(req, res, next))
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<F>()
    }
}

/// An [`ErrorHandler`] backed by an async closure.
pub struct FnErrorHandler<F> {
    func: F,
}

impl<F> FnErrorHandler<F> {
    /// Wraps a closure.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(ChainError, Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        err: ChainError,
        req: Request,
        res: Response,
        next: Next,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.func)(err, req, res, next))
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<F>()
    }
}

/// Boxes a closure as a normal handler, for bulk registration.
///
/// # Example
///
/// ```
/// use http::Method;
/// use stitch_chain::{handler_fn, Chain};
///
/// let chain = Chain::new().with_layers(
///     Method::GET,
///     [
///         handler_fn(|_req, _res, next| async move {
///             next.run().await;
///             Ok(())
///         }),
///         handler_fn(|_req, res, _next| async move {
///             res.end("done")?;
///             Ok(())
///         }),
///     ],
/// );
/// assert_eq!(chain.len(), 2);
/// ```
pub fn handler_fn<F, Fut>(func: F) -> BoxedHandler
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnHandler::new(func))
}

/// Boxes a closure as an error handler, for bulk registration.
pub fn error_handler_fn<F, Fut>(func: F) -> BoxedErrorHandler
where
    F: Fn(ChainError, Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnErrorHandler::new(func))
}

/// Adapts a two-argument closure into a handler that never continues.
///
/// The `next` continuation is dropped, so the walk stops after this handler.
/// The closure is expected to finalize the response.
///
/// # Example
///
/// ```
/// use stitch_chain::{terminal, Chain};
///
/// let chain = Chain::new().get(terminal(|_req, res| async move {
///     res.end("hello")?;
///     Ok(())
/// }));
/// assert_eq!(chain.len(), 1);
/// ```
pub fn terminal<F, Fut>(
    func: F,
) -> impl Fn(Request, Response, Next) -> Fut + Send + Sync + 'static
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    move |req: Request, res: Response, next: Next| {
        drop(next);
        func(req, res)
    }
}
