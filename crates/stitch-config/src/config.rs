//! The root [`StitchConfig`] type.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use stitch_server::ServerConfig;
use stitch_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

use crate::schema::{LogFormat, LoggingSection, MetricsSection, ServerSection};
use crate::ConfigError;

/// Complete Stitch configuration.
///
/// # Example
///
/// ```
/// use stitch_config::StitchConfig;
///
/// let config = StitchConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StitchConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl StitchConfig {
    /// Development preset: debug level, pretty output with locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config.logging.file_line_info = true;
        config
    }

    /// Production preset: info level, JSON output, metrics on.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.metrics.enabled = true;
        config
    }

    /// Checks values serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.max_connections == Some(0) {
            return Err(ConfigError::invalid_value(
                "server.max_connections",
                "must be at least 1",
            ));
        }

        if let Err(e) = stitch_telemetry::logging::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        if self.metrics.enabled {
            if let Some(addr) = &self.metrics.listen_addr {
                if addr.parse::<SocketAddr>().is_err() {
                    return Err(ConfigError::invalid_value(
                        "metrics.listen_addr",
                        format!("invalid socket address: {addr}"),
                    ));
                }
            }
        }

        let buckets = &self.metrics.duration_buckets;
        if buckets.is_empty() || buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::invalid_value(
                "metrics.duration_buckets",
                "must be non-empty and strictly increasing",
            ));
        }

        Ok(())
    }

    /// Returns the server runtime configuration.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::from(&self.server)
    }

    /// Returns the logging runtime configuration.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from(&self.logging)
    }

    /// Returns the metrics runtime configuration.
    #[must_use]
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig::from(&self.metrics)
    }

    /// Returns the combined telemetry configuration.
    #[must_use]
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.logging.service_name.clone(),
            metrics: self.metrics_config(),
            logging: self.log_config(),
        }
    }
}
