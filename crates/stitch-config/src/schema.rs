//! Configuration sections and their conversions into runtime types.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stitch_server::ServerConfig;
use stitch_telemetry::{LogConfig, MetricsConfig};

/// Server section.
///
/// ```toml
/// [server]
/// http_addr = "0.0.0.0:8080"
/// shutdown_timeout_secs = 30
/// request_timeout_ms = 30000
/// keep_alive = true
/// max_connections = 10000
/// max_body_bytes = 2097152
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Request timeout in milliseconds. `0` disables the timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// HTTP/1.1 keep-alive.
    #[serde(default = "default_true")]
    pub keep_alive: bool,

    /// Maximum concurrent connections. Unset means unlimited.
    #[serde(default)]
    pub max_connections: Option<usize>,

    /// Maximum request body size in bytes. Unset means unlimited.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: Option<usize>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            keep_alive: true,
            max_connections: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl From<&ServerSection> for ServerConfig {
    fn from(section: &ServerSection) -> Self {
        let request_timeout = (section.request_timeout_ms > 0)
            .then(|| Duration::from_millis(section.request_timeout_ms));

        Self::builder()
            .http_addr(section.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(section.shutdown_timeout_secs))
            .request_timeout(request_timeout)
            .keep_alive(section.keep_alive)
            .max_connections(section.max_connections)
            .max_body_bytes(section.max_body_bytes)
            .build()
    }
}

fn default_http_addr() -> String {
    stitch_server::config::DEFAULT_HTTP_ADDR.to_string()
}

const fn default_shutdown_timeout() -> u64 {
    stitch_server::config::DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

const fn default_request_timeout() -> u64 {
    stitch_server::config::DEFAULT_REQUEST_TIMEOUT_SECS * 1000
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_body_bytes() -> Option<usize> {
    Some(stitch_server::config::DEFAULT_MAX_BODY_BYTES)
}

const fn default_true() -> bool {
    true
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Whether logging is installed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `stitch_chain=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include file and line.
    #[serde(default)]
    pub file_line_info: bool,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include the module path.
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// Service name reported at startup.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: default_service_name(),
        }
    }
}

impl From<&LoggingSection> for LogConfig {
    fn from(section: &LoggingSection) -> Self {
        Self {
            enabled: section.enabled,
            level: section.level.clone(),
            json_format: section.format == LogFormat::Json,
            span_events: section.span_events,
            file_line_info: section.file_line_info,
            thread_ids: section.thread_ids,
            include_target: section.include_target,
            service_name: section.service_name.clone(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "stitch".to_string()
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install a Prometheus recorder.
    #[serde(default)]
    pub enabled: bool,

    /// Standalone scrape listener address. Unset keeps metrics in-process.
    #[serde(default)]
    pub listen_addr: Option<String>,

    /// Request duration histogram buckets, in seconds.
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: None,
            duration_buckets: default_duration_buckets(),
        }
    }
}

impl From<&MetricsSection> for MetricsConfig {
    fn from(section: &MetricsSection) -> Self {
        Self {
            enabled: section.enabled,
            listen_addr: section.listen_addr.clone(),
            duration_buckets: section.duration_buckets.clone(),
        }
    }
}

fn default_duration_buckets() -> Vec<f64> {
    MetricsConfig::default().duration_buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_section_defaults_match_server_config() {
        let from_section = ServerConfig::from(&ServerSection::default());
        assert_eq!(from_section, ServerConfig::default());
    }

    #[test]
    fn test_zero_request_timeout_disables_it() {
        let section = ServerSection {
            request_timeout_ms: 0,
            ..ServerSection::default()
        };
        assert!(ServerConfig::from(&section).request_timeout().is_none());
    }

    #[test]
    fn test_logging_section_defaults_match_production() {
        assert_eq!(LogConfig::from(&LoggingSection::default()), LogConfig::production());
    }

    #[test]
    fn test_pretty_format_disables_json() {
        let section = LoggingSection {
            format: LogFormat::Pretty,
            ..LoggingSection::default()
        };
        assert!(!LogConfig::from(&section).json_format);
    }

    #[test]
    fn test_metrics_section_defaults_match_metrics_config() {
        assert_eq!(MetricsConfig::from(&MetricsSection::default()), MetricsConfig::default());
    }

    #[test]
    fn test_partial_server_section_fills_defaults() {
        let section: ServerSection = toml::from_str("http_addr = \"127.0.0.1:1\"").unwrap();
        assert_eq!(section.http_addr, "127.0.0.1:1");
        assert_eq!(section.shutdown_timeout_secs, default_shutdown_timeout());
        assert!(section.keep_alive);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ServerSection, _> = toml::from_str("http2_enabled = true");
        assert!(result.is_err());
    }
}
