//! # Stitch Server
//!
//! Serves a [`stitch_chain::Chain`] over HTTP/1.1 with hyper.
//!
//! - [`ChainService`]: a hyper service that walks the chain per request,
//!   with a request timeout, a body limit and request ID propagation
//! - [`Server`]: the accept loop with connection limits and graceful
//!   shutdown
//! - [`ServerConfig`]: bind address, timeouts and limits
//!
//! ## Example
//!
//! ```rust,ignore
//! use stitch_chain::{terminal, Chain};
//! use stitch_server::{Server, ServerConfig};
//!
//! let app = Chain::new().get(terminal(|_req, res| async move {
//!     res.end("hello")?;
//!     Ok(())
//! }));
//!
//! Server::new(app, ServerConfig::default()).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod service;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use server::Server;
pub use service::{ChainService, IntoChainService, REQUEST_ID_HEADER};
pub use shutdown::ShutdownSignal;
