//! HTTP/1.1 server built on hyper and Tokio.
//!
//! The server binds a TCP listener, serves each connection on its own task
//! with a [`ChainService`], and on shutdown stops accepting, asks open
//! connections to finish their current request, then waits for them up to
//! the configured shutdown timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use stitch_chain::{terminal, Chain};
//! use stitch_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Chain::new().get(terminal(|_req, res| async move {
//!         res.end("hello")?;
//!         Ok(())
//!     }));
//!
//!     let config = ServerConfig::builder().http_addr("0.0.0.0:8080").build();
//!     Server::new(app, config).run().await?;
//!     Ok(())
//! }
//! ```

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use stitch_chain::Chain;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::service::ChainService;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Serves a [`Chain`] over HTTP/1.1.
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
    service: ChainService,
}

impl Server {
    /// Creates a server for `chain`.
    #[must_use]
    pub fn new(chain: Chain, config: ServerConfig) -> Self {
        let service = ChainService::from_config(chain, &config);
        Self { config, service }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the service every connection is served with.
    #[must_use]
    pub const fn service(&self) -> &ChainService {
        &self.service
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be registered or the
    /// address cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals()?;
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                reason: e.to_string(),
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        self.run_with_listener(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Server listening");

        let tracker = ConnectionTracker::new();
        let limit = self.config.max_connections().map(|max| Arc::new(Semaphore::new(max)));

        loop {
            let permit = match &limit {
                Some(semaphore) => tokio::select! {
                    permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
                    () = shutdown.recv() => break,
                },
                None => None,
            };

            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote_addr)) => {
                        let token = tracker.acquire();
                        let service = self.service.clone();
                        let keep_alive = self.config.keep_alive();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            serve_connection(stream, remote_addr, service, keep_alive, shutdown).await;
                            drop(permit);
                            drop(token);
                        });
                    }
                    Err(error) => tracing::error!(%error, "Failed to accept connection"),
                },
                () = shutdown.recv() => break,
            }
        }

        tracing::info!("Shutdown signal received, stopping server");
        drop(listener);

        let shutdown_timeout = self.config.shutdown_timeout();
        tracing::info!(
            timeout = ?shutdown_timeout,
            connections = tracker.active_connections(),
            "Waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => tracing::info!("All connections closed"),
            () = tokio::time::sleep(shutdown_timeout) => tracing::warn!(
                connections = tracker.active_connections(),
                "Shutdown timeout reached with connections still open"
            ),
        }

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    service: ChainService,
    keep_alive: bool,
    shutdown: ShutdownSignal,
) {
    let conn = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            tracing::debug!(%remote_addr, "Draining connection for shutdown");
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(error) = result {
        tracing::debug!(%remote_addr, %error, "Connection closed with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_invalid_address() {
        let config = ServerConfig::builder().http_addr("not-a-valid-address").build();
        let result = Server::new(Chain::new(), config)
            .run_with_shutdown(ShutdownSignal::new())
            .await;

        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_run_and_shutdown() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .shutdown_timeout(Duration::from_millis(100))
            .build();
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            Server::new(Chain::new(), config).run_with_shutdown(shutdown),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_connection_limit_stops_on_shutdown() {
        let config = ServerConfig::builder()
            .max_connections(Some(1))
            .shutdown_timeout(Duration::from_millis(100))
            .build();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            Server::new(Chain::new(), config).run_with_listener(listener, shutdown),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }
}
