//! The chain walker.
//!
//! A walk owns a [`Cursor`]: the index to scan from, the request and response
//! handles, and the [`Exit`] policy that decides what happens when no layer
//! is left. The cursor moves into the [`Next`] handed to each handler, so
//! exactly one party can continue the walk at any time.
//!
//! ```text
//! walk ─► response finished? ── yes ─► stop
//!              │ no
//!              ▼
//!         find next layer ── none ─► exit policy (respond / defer / report)
//!              │
//!              ▼
//!         call handler ─► Err or panic, Next unused ─► loop in error mode
//! ```

use crate::chain::ChainInner;
use crate::handler::{BoxFuture, HandlerResult};
use crate::layer::{LayerHandler, LayerKind};
use crate::next::Next;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use stitch_core::{ChainError, Request, Response};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// What a walk does once it runs out of matching layers.
pub(crate) enum Exit {
    /// Finalize the response through the chain's default hooks.
    Respond,
    /// Hand control back to an enclosing chain.
    Defer(Next),
    /// Report the outcome to the caller of `apply`.
    Report(oneshot::Sender<HandlerResult>),
}

/// Per-request walk state.
pub(crate) struct Cursor {
    chain: Arc<ChainInner>,
    index: usize,
    req: Request,
    res: Response,
    exit: Exit,
}

impl Cursor {
    pub(crate) fn new(chain: Arc<ChainInner>, req: Request, res: Response, exit: Exit) -> Self {
        Self {
            chain,
            index: 0,
            req,
            res,
            exit,
        }
    }

    async fn exhaust(self, error: Option<ChainError>) {
        match self.exit {
            Exit::Respond => respond(&self.chain, &self.req, &self.res, error),
            Exit::Defer(outer) => match error {
                None => outer.run().await,
                Some(err) => outer.fail(err).await,
            },
            Exit::Report(sender) => {
                // The receiver is gone only if `apply` was cancelled.
                let _ = sender.send(error.map_or(Ok(()), Err));
            }
        }
    }
}

/// Walks the chain from the cursor position.
///
/// Returns once the handler that was invoked last has returned. Work deferred
/// by a handler (a `Next` moved into a spawned task) continues on its own.
pub(crate) fn walk(mut cursor: Cursor, mut error: Option<ChainError>) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        loop {
            if cursor.res.is_finished() {
                if let Some(err) = &error {
                    debug!(
                        request_id = %cursor.req.id(),
                        error = %err,
                        "response already finished, dropping pending error"
                    );
                }
                return;
            }

            let kind = if error.is_some() {
                LayerKind::Error
            } else {
                LayerKind::Normal
            };
            let found = cursor
                .chain
                .registry
                .find(cursor.index, cursor.req.method(), kind)
                .map(|(index, layer)| (index, layer.handler().clone(), layer.name()));

            let Some((index, handler, name)) = found else {
                debug!(
                    request_id = %cursor.req.id(),
                    method = %cursor.req.method(),
                    mode = %kind,
                    "handler chain exhausted"
                );
                cursor.exhaust(error).await;
                return;
            };

            debug!(
                request_id = %cursor.req.id(),
                layer = index,
                handler = name,
                mode = %kind,
                "dispatching layer"
            );

            cursor.index = index + 1;
            let req = cursor.req.clone();
            let res = cursor.res.clone();
            let slot = Arc::new(Mutex::new(Some(cursor)));
            let next = Next::new(Arc::clone(&slot));

            let Err(err) = invoke(handler, error.take(), req, res, next).await else {
                return;
            };

            let resumed = slot.lock().take();
            match resumed {
                Some(resumed) => {
                    cursor = resumed;
                    error = Some(err);
                }
                None => {
                    warn!(
                        handler = name,
                        error = %err,
                        "handler failed after calling next, error dropped"
                    );
                    return;
                }
            }
        }
    })
}

/// Calls a handler, turning panics into [`ChainError::Panic`].
async fn invoke(
    handler: LayerHandler,
    error: Option<ChainError>,
    req: Request,
    res: Response,
    next: Next,
) -> HandlerResult {
    let call = std::panic::catch_unwind(AssertUnwindSafe(move || match handler {
        LayerHandler::Normal(handler) => handler.call(req, res, next),
        LayerHandler::Error(handler) => {
            let err = error.unwrap_or_else(|| ChainError::msg("error handler called without an error"));
            handler.call(err, req, res, next)
        }
    }));

    let outcome = match call {
        Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
        Err(payload) => Err(payload),
    };

    outcome.unwrap_or_else(|payload| {
        let err = ChainError::from_panic(payload.as_ref());
        error!(error = %err, "handler panicked");
        Err(err)
    })
}

/// Finalizes an exhausted walk with the chain's default outcome.
fn respond(chain: &ChainInner, req: &Request, res: &Response, error: Option<ChainError>) {
    if res.is_finished() {
        return;
    }

    if res.headers_sent() {
        if let Some(err) = &error {
            error!(request_id = %req.id(), error = %err, "unhandled error after headers were sent");
        }
    } else {
        match &error {
            None => (chain.on_no_match)(req, res),
            Some(err) => {
                error!(request_id = %req.id(), error = %err, "unhandled error in handler chain");
                (chain.on_unhandled_error)(err, req, res);
            }
        }
    }

    if !res.is_finished() {
        if let Err(err) = res.end(b"") {
            debug!(error = %err, "failed to finalize exhausted response");
        }
    }
}
