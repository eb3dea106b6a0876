//! # Stitch Chain
//!
//! The handler chain engine: ordered layers, method dispatch, error layers,
//! nested chains.
//!
//! ## Walk
//!
//! ```text
//! request ─► layer 0 ─next─► layer 1 ─next─► ... ─► exhausted ─► 404
//!               │ fail / Err / panic
//!               ▼
//!            next error layer ─run─► normal layers resume
//!               │ no error layer left
//!               ▼
//!              500
//! ```
//!
//! | Entry point | Layer kind | Method filter |
//! |-------------|-----------|---------------|
//! | `get`, `post`, ... `patch` | normal | that method |
//! | `on(method, ..)` | normal | any method, including extensions |
//! | `all`, `mount` | normal | every method |
//! | `error` | error | every method |
//! | `error_on(method, ..)` | error | that method |
//!
//! ## Entry points
//!
//! - [`Chain::handle`] answers the request, falling back to 404 or 500.
//! - [`Chain::apply`] runs the chain on a request and response owned by the
//!   caller and reports the outcome instead of answering.
//! - [`Handler::call`] lets a chain run as a single layer of another chain.
//!
//! ## Example
//!
//! ```
//! use stitch_chain::{terminal, Chain};
//! use stitch_core::{Request, Response};
//! use http::Method;
//!
//! # tokio_test::block_on(async {
//! let api = Chain::new()
//!     .get(|_req, _res, _next| async move {
//!         Err(anyhow::anyhow!("database unavailable").into())
//!     })
//!     .error(|err, _req, res, _next| async move {
//!         res.end(err.message())?;
//!         Ok(())
//!     });
//!
//! let app = Chain::new()
//!     .mount(api)
//!     .all(terminal(|_req, res| async move {
//!         res.end("fallback")?;
//!         Ok(())
//!     }));
//!
//! let res = Response::new();
//! app.handle(Request::new(Method::GET, "/"), res.clone()).await;
//! assert_eq!(res.body(), "database unavailable");
//!
//! let res = Response::new();
//! app.handle(Request::new(Method::POST, "/"), res.clone()).await;
//! assert_eq!(res.body(), "fallback");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/stitch-chain/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chain;
mod handler;
mod layer;
mod next;
mod registry;
mod walker;

pub use chain::{Chain, NoMatchHook, UnhandledErrorHook};
pub use handler::{
    error_handler_fn, handler_fn, terminal, BoxFuture, BoxedErrorHandler, BoxedHandler,
    ErrorHandler, FnErrorHandler, FnHandler, Handler, HandlerResult,
};
pub use layer::{Layer, LayerHandler, LayerKind};
pub use next::Next;
pub use registry::Registry;
