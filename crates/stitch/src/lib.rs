//! # Stitch
//!
//! Express-style handler chains for hyper.
//!
//! A [`Chain`](chain::Chain) is an ordered list of layers. Each request walks
//! the layers whose method filter matches; a layer either finishes the
//! response or passes control on with `next.run()`. Errors, returned or
//! panicked, skip ahead to the next error layer. A chain is itself a
//! handler, so chains nest.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stitch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stitch::Error> {
//!     let app = Chain::new()
//!         .all(|req, res, next| async move {
//!             res.set_header("x-request-id", req.id().to_string())?;
//!             next.run().await;
//!             Ok(())
//!         })
//!         .get(terminal(|_req, res| async move {
//!             res.end("hello")?;
//!             Ok(())
//!         }))
//!         .error(|err, _req, res, _next| async move {
//!             res.send_text(StatusCode::BAD_GATEWAY, err.message())?;
//!             Ok(())
//!         });
//!
//!     let config = ConfigLoader::new()
//!         .with_optional_file("stitch.toml")?
//!         .with_env_prefix("STITCH")
//!         .load()?;
//!
//!     stitch::serve(app, &config).await
//! }
//! ```
//!
//! ## Crates
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`core`] | `stitch-core` | `Request`, `Response`, `ChainError` |
//! | [`chain`] | `stitch-chain` | `Chain`, `Next`, handler traits |
//! | [`server`] | `stitch-server` | hyper service and server |
//! | [`telemetry`] | `stitch-telemetry` | logging and metrics |
//! | [`config`] | `stitch-config` | layered configuration |

#![doc(html_root_url = "https://docs.rs/stitch/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use stitch_chain as chain;
pub use stitch_config as config;
pub use stitch_core as core;
pub use stitch_server as server;
pub use stitch_telemetry as telemetry;

use thiserror::Error;

/// Errors from [`serve`] and application startup.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] stitch_config::ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] stitch_telemetry::TelemetryError),

    /// The server failed to start.
    #[error(transparent)]
    Server(#[from] stitch_server::ServerError),
}

/// Installs telemetry from `config`, then serves `chain` until SIGTERM or
/// SIGINT.
///
/// # Errors
///
/// Returns an error if telemetry cannot be installed or the server cannot
/// start.
pub async fn serve(chain: stitch_chain::Chain, config: &stitch_config::StitchConfig) -> Result<(), Error> {
    stitch_telemetry::init_telemetry(&config.telemetry_config())?;
    stitch_server::Server::new(chain, config.server_config())
        .run()
        .await?;
    Ok(())
}

/// Common imports.
///
/// ```rust
/// use stitch::prelude::*;
///
/// let chain = Chain::new().get(terminal(|_req, res| async move {
///     res.end("ok")?;
///     Ok(())
/// }));
/// assert_eq!(chain.len(), 1);
/// ```
pub mod prelude {
    pub use stitch_chain::{
        terminal, BoxFuture, Chain, ErrorHandler, Handler, HandlerResult, Next,
    };
    pub use stitch_config::{ConfigLoader, StitchConfig};
    pub use stitch_core::http::{Method, StatusCode};
    pub use stitch_core::{ChainError, Request, RequestId, Response};
    pub use stitch_server::{ChainService, IntoChainService, Server, ServerConfig, ShutdownSignal};
}
