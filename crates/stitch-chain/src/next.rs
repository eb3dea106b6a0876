//! The one-shot continuation handed to every handler.

use crate::walker::{walk, Cursor};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use stitch_core::ChainError;
use tracing::debug;

/// Continues the walk of a handler chain.
///
/// A `Next` is consumed by value, so it can be used at most once:
///
/// - [`Next::run`] continues with the next matching normal layer. From an
///   error handler it resolves the pending error.
/// - [`Next::fail`] switches to error mode and continues with the next
///   matching error layer.
/// - Dropping it without calling either halts the walk.
///
/// `Next` is `Send`, so it may be moved into a spawned task and called later.
#[must_use = "dropping `Next` without calling it halts the chain"]
pub struct Next {
    slot: Arc<Mutex<Option<Cursor>>>,
}

impl Next {
    pub(crate) fn new(slot: Arc<Mutex<Option<Cursor>>>) -> Self {
        Self { slot }
    }

    /// Continues the walk in normal mode.
    ///
    /// Resolves once the rest of the chain has returned control.
    pub async fn run(self) {
        self.resume(None).await;
    }

    /// Continues the walk in error mode with `err`.
    pub async fn fail(self, err: impl Into<ChainError>) {
        self.resume(Some(err.into())).await;
    }

    async fn resume(self, error: Option<ChainError>) {
        let cursor = self.slot.lock().take();
        match cursor {
            Some(cursor) => walk(cursor, error).await,
            None => debug!("continuation already taken by a failed handler, ignoring"),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("pending", &self.slot.lock().is_some())
            .finish()
    }
}
