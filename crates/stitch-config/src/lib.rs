//! Typed configuration for Stitch servers.
//!
//! - TOML and JSON files or strings
//! - `STITCH__SECTION__KEY` environment overrides, optionally from `.env`
//! - strict parsing: unknown keys are errors
//! - conversion into [`stitch_server::ServerConfig`] and the
//!   `stitch_telemetry` logging and metrics configurations
//!
//! # Example
//!
//! ```no_run
//! use stitch_config::ConfigLoader;
//!
//! # fn main() -> Result<(), stitch_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("stitch.toml")?
//!     .with_env_prefix("STITCH")
//!     .load()?;
//!
//! let server_config = config.server_config();
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! keep_alive = true
//!
//! [logging]
//! level = "info"
//! format = "json"
//! service_name = "orders"
//!
//! [metrics]
//! enabled = true
//! listen_addr = "0.0.0.0:9090"
//! ```

mod config;
mod error;
mod loader;
mod schema;

pub use config::StitchConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LogFormat, LoggingSection, MetricsSection, ServerSection};
