//! The composable handler chain.

use crate::handler::{
    BoxFuture, BoxedHandler, ErrorHandler, FnErrorHandler, FnHandler, Handler, HandlerResult,
};
use crate::layer::Layer;
use crate::next::Next;
use crate::registry::Registry;
use crate::walker::{walk, Cursor, Exit};
use http::{Method, StatusCode};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use stitch_core::{ChainError, MethodFilter, Request, Response};
use tokio::sync::oneshot;
use tracing::debug;

/// Hook that finalizes a response when no layer handled the request.
pub type NoMatchHook = Arc<dyn Fn(&Request, &Response) + Send + Sync + 'static>;

/// Hook that finalizes a response when an error was never handled.
pub type UnhandledErrorHook = Arc<dyn Fn(&ChainError, &Request, &Response) + Send + Sync + 'static>;

#[derive(Clone)]
pub(crate) struct ChainInner {
    pub(crate) registry: Registry,
    pub(crate) on_no_match: NoMatchHook,
    pub(crate) on_unhandled_error: UnhandledErrorHook,
}

/// An ordered chain of handlers.
///
/// Layers run in registration order. Each layer either finalizes the
/// response, passes control with `next.run()`, or raises an error with
/// `next.fail(err)` (or by returning `Err`). While an error is pending only
/// error layers run; normal layers are skipped.
///
/// `Chain` is cheap to clone. It implements [`Handler`], so a chain can be
/// mounted inside another one. Mounting takes a snapshot: layers added to the
/// source chain afterwards are not seen by the mounted copy.
///
/// # Example
///
/// ```
/// use stitch_chain::Chain;
/// use stitch_core::{Request, Response};
/// use http::{Method, StatusCode};
///
/// #[derive(Clone)]
/// struct Greeting(&'static str);
///
/// # tokio_test::block_on(async {
/// let chain = Chain::new()
///     .all(|req, _res, next| async move {
///         req.insert(Greeting("hello"));
///         next.run().await;
///         Ok(())
///     })
///     .get(|req, res, _next| async move {
///         let greeting = req.get::<Greeting>().map_or("", |g| g.0);
///         res.end(greeting)?;
///         Ok(())
///     });
///
/// let res = Response::new();
/// chain.handle(Request::new(Method::GET, "/"), res.clone()).await;
/// assert_eq!(res.body(), "hello");
///
/// let res = Response::new();
/// chain.handle(Request::new(Method::POST, "/"), res.clone()).await;
/// assert_eq!(res.status(), StatusCode::NOT_FOUND);
/// # });
/// ```
#[derive(Clone)]
pub struct Chain {
    inner: Arc<ChainInner>,
}

macro_rules! method_entry_points {
    ($($(#[$doc:meta])* $name:ident => $method:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<F, Fut>(self, handler: F) -> Self
            where
                F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = HandlerResult> + Send + 'static,
            {
                self.route(Method::$method, FnHandler::new(handler))
            }
        )*
    };
}

impl Chain {
    /// Creates an empty chain with the default 404 and 500 outcomes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChainInner {
                registry: Registry::new(),
                on_no_match: Arc::new(default_no_match),
                on_unhandled_error: Arc::new(default_unhandled_error),
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut ChainInner {
        Arc::make_mut(&mut self.inner)
    }

    method_entry_points! {
        /// Registers a handler for `GET` requests.
        get => GET;
        /// Registers a handler for `HEAD` requests.
        head => HEAD;
        /// Registers a handler for `POST` requests.
        post => POST;
        /// Registers a handler for `PUT` requests.
        put => PUT;
        /// Registers a handler for `DELETE` requests.
        delete => DELETE;
        /// Registers a handler for `OPTIONS` requests.
        options => OPTIONS;
        /// Registers a handler for `TRACE` requests.
        trace => TRACE;
        /// Registers a handler for `PATCH` requests.
        patch => PATCH;
    }

    /// Registers a handler for an arbitrary method, including extension
    /// methods such as `PURGE`.
    pub fn on<F, Fut>(self, method: Method, handler: F) -> Self
    where
        F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(method, FnHandler::new(handler))
    }

    /// Registers a handler that runs for every method.
    pub fn all<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(MethodFilter::All, FnHandler::new(handler))
    }

    /// Registers an error handler that runs for every method.
    pub fn error<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(ChainError, Request, Response, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.error_handler(MethodFilter::All, FnErrorHandler::new(handler))
    }

    /// Registers an error handler that only runs for `method`.
    pub fn error_on<F, Fut>(self, method: Method, handler: F) -> Self
    where
        F: Fn(ChainError, Request, Response, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.error_handler(method, FnErrorHandler::new(handler))
    }

    /// Registers any [`Handler`] under a method filter.
    pub fn route(mut self, method: impl Into<MethodFilter>, handler: impl Handler) -> Self {
        self.inner_mut()
            .registry
            .push(Layer::normal(method, Arc::new(handler)));
        self
    }

    /// Registers any [`ErrorHandler`] under a method filter.
    pub fn error_handler(mut self, method: impl Into<MethodFilter>, handler: impl ErrorHandler) -> Self {
        self.inner_mut()
            .registry
            .push(Layer::error(method, Arc::new(handler)));
        self
    }

    /// Mounts a handler, typically another [`Chain`], for every method.
    ///
    /// A mounted chain runs its own layers in place. When it runs out of
    /// layers it hands control back to this chain instead of answering 404;
    /// an error it does not handle continues in this chain's error layers.
    pub fn mount(self, handler: impl Handler) -> Self {
        self.route(MethodFilter::All, handler)
    }

    /// Registers several boxed handlers under one method filter, in order.
    pub fn with_layers<I>(mut self, method: impl Into<MethodFilter>, handlers: I) -> Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.inner_mut().registry.register(method, handlers);
        self
    }

    /// Replaces the outcome used when no layer finalizes the response.
    ///
    /// The default answers `404 Not Found` with a plain-text body.
    pub fn on_no_match<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &Response) + Send + Sync + 'static,
    {
        self.inner_mut().on_no_match = Arc::new(hook);
        self
    }

    /// Replaces the outcome used when an error reaches the end of the chain.
    ///
    /// The default answers `500 Internal Server Error` with a plain-text body
    /// and never exposes the error to the client.
    pub fn on_unhandled_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ChainError, &Request, &Response) + Send + Sync + 'static,
    {
        self.inner_mut().on_unhandled_error = Arc::new(hook);
        self
    }

    /// Runs the chain for one request and finalizes the response if no
    /// layer did.
    ///
    /// Returns when the last invoked handler returns. A handler that moved
    /// its `Next` into another task finishes the walk from there; wait on
    /// [`Response::finished`] to observe completion.
    pub async fn handle(&self, req: Request, res: Response) {
        walk(Cursor::new(Arc::clone(&self.inner), req, res, Exit::Respond), None).await;
    }

    /// Runs the chain on an existing request and response without any
    /// default outcome.
    ///
    /// Resolves once the walk stops. Returns `Ok(())` when the chain runs
    /// out of layers, finalizes the response, or halts, and `Err` when an
    /// error reaches the end of the chain unhandled. The response is left
    /// untouched in both cases, so the caller can still write it.
    pub async fn apply(&self, req: Request, res: Response) -> HandlerResult {
        let (sender, receiver) = oneshot::channel();
        walk(
            Cursor::new(Arc::clone(&self.inner), req, res, Exit::Report(sender)),
            None,
        )
        .await;
        // A closed channel means the walk stopped without reaching the end.
        receiver.await.unwrap_or(Ok(()))
    }

    /// Returns the number of registered layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns `true` if no layer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Returns the layer registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("layers", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl Handler for Chain {
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture<'static, HandlerResult> {
        let cursor = Cursor::new(Arc::clone(&self.inner), req, res, Exit::Defer(next));
        Box::pin(async move {
            walk(cursor, None).await;
            HandlerResult::Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "stitch_chain::Chain"
    }
}

fn default_no_match(req: &Request, res: &Response) {
    debug!(request_id = %req.id(), path = req.path(), "no layer finalized the response");
    if let Err(err) = res.send_text(StatusCode::NOT_FOUND, "Not Found") {
        debug!(error = %err, "failed to write 404 response");
    }
}

fn default_unhandled_error(_err: &ChainError, _req: &Request, res: &Response) {
    if let Err(err) = res.send_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error") {
        debug!(error = %err, "failed to write 500 response");
    }
}
