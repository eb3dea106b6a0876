//! Logging and metrics for Stitch services.
//!
//! - **Logging**: `tracing-subscriber` registry with JSON or pretty output
//! - **Metrics**: Prometheus-format request metrics via the `metrics` crate
//!
//! The handler chain and the server adapter only emit `tracing` events and
//! `metrics` samples; this crate decides where they go.
//!
//! # Example
//!
//! ```rust,ignore
//! use stitch_telemetry::{init_telemetry, LogConfig, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("orders")
//!     .logging(LogConfig::development())
//!     .build();
//! init_telemetry(&config)?;
//! ```

#![doc(html_root_url = "https://docs.rs/stitch-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, record_request, render_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
