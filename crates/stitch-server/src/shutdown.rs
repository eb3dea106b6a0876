//! Graceful shutdown coordination.
//!
//! [`ShutdownSignal`] tells the accept loop and every open connection to
//! wind down; [`ConnectionTracker`] lets the server wait for the
//! connections to finish draining.
//!
//! # Example
//!
//! ```rust,ignore
//! use stitch_server::ShutdownSignal;
//! use std::time::Duration;
//!
//! let shutdown = ShutdownSignal::new();
//! tokio::select! {
//!     () = shutdown.recv() => println!("shutting down"),
//!     () = tokio::time::sleep(Duration::from_secs(60)) => println!("timed out"),
//! }
//! ```

use crate::error::ServerError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// A cloneable, one-way shutdown flag.
///
/// # Example
///
/// ```rust
/// use stitch_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let observer = shutdown.clone();
///
/// shutdown.trigger();
/// assert!(observer.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates a signal that has not been triggered.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Triggers shutdown. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_if_modified(|triggered| !std::mem::replace(triggered, true));
    }

    /// Returns `true` once shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    /// Returns a future that completes when shutdown is triggered.
    ///
    /// Completes immediately if it already was.
    pub fn recv(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            // Err means every clone was dropped, which also ends the wait.
            let _ = receiver.wait_for(|triggered| *triggered).await;
        }
    }

    /// Creates a signal that triggers on SIGTERM or SIGINT (Ctrl+C
    /// elsewhere).
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Signal` if the handlers cannot be registered.
    pub fn with_os_signals() -> Result<Self, ServerError> {
        let signal = Self::new();
        let trigger = signal.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal as unix_signal, SignalKind};

            let mut sigterm =
                unix_signal(SignalKind::terminate()).map_err(ServerError::Signal)?;
            let mut sigint = unix_signal(SignalKind::interrupt()).map_err(ServerError::Signal)?;

            tokio::spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
                    _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
                }
                trigger.trigger();
            });
        }

        #[cfg(not(unix))]
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    trigger.trigger();
                }
                Err(error) => tracing::error!(%error, "Failed to listen for Ctrl+C"),
            }
        });

        Ok(signal)
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts open connections so shutdown can wait for them to drain.
///
/// # Example
///
/// ```rust
/// use stitch_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<watch::Sender<usize>>,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        let (active, _) = watch::channel(0);
        Self {
            active: Arc::new(active),
        }
    }

    /// Registers a connection. It counts as open until the token drops.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.send_modify(|count| *count += 1);
        ConnectionToken {
            active: Arc::clone(&self.active),
        }
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        *self.active.borrow()
    }

    /// Waits until every token has been dropped.
    pub async fn wait_for_shutdown(&self) {
        let mut receiver = self.active.subscribe();
        let _ = receiver.wait_for(|count| *count == 0).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// An open connection, released on drop.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<watch::Sender<usize>>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        self.active.send_modify(|count| *count = count.saturating_sub(1));
    }
}
