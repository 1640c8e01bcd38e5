//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// # Example
///
/// ```
/// use den_config::ServerSection;
///
/// let config = ServerSection {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.chunk_size, 10 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Time allowed to receive a request body, in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Chunk size used when sending response bodies, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_chunk_size() -> usize {
    10 * 1024
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable, multi-line output.
    Pretty,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Use ANSI colors in pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
        }
    }
}

impl LoggingSection {
    /// Converts into the logging subsystem's configuration.
    #[must_use]
    pub fn to_log_config(&self) -> den_telemetry::LogConfig {
        den_telemetry::LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            ansi: self.ansi_enabled,
            ..Default::default()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Export Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
        }
    }
}

impl MetricsSection {
    /// Converts into the metrics subsystem's configuration.
    #[must_use]
    pub fn to_metrics_config(&self) -> den_telemetry::MetricsConfig {
        den_telemetry::MetricsConfig {
            enabled: self.enabled,
            addr: self.addr.clone(),
            ..Default::default()
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

/// A configured route: an endpoint served by a named handler.
///
/// # Example
///
/// ```toml
/// [[routes]]
/// endpoint = "static"
/// handler = "files"
/// options = { root = "./public", index = "index.html" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Endpoint the handler is registered under.
    pub endpoint: String,

    /// Name of the handler in the handler registry.
    pub handler: String,

    /// Also answer requests for endpoints without a handler.
    #[serde(default)]
    pub fallback: bool,

    /// Options passed to the handler factory.
    #[serde(default)]
    pub options: HandlerOptions,
}

impl RouteConfig {
    /// Creates a route with default options.
    pub fn new(endpoint: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            handler: handler.into(),
            fallback: false,
            options: HandlerOptions::default(),
        }
    }
}

/// Options understood by the built-in handler factories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HandlerOptions {
    /// Base directory of a file handler.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Index file served for directories.
    #[serde(default)]
    pub index: Option<String>,

    /// Pages of a page-tree handler.
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

/// One page of a page-tree handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PageConfig {
    /// `/`-separated virtual path the page is registered at.
    pub path: String,

    /// Page content.
    pub body: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerSection::default();
        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert_eq!(config.request_timeout_ms, 30000);
        assert_eq!(config.chunk_size, 10240);
    }

    #[test]
    fn test_logging_defaults() {
        let config = LoggingSection::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);

        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, r#""json""#);
    }

    #[test]
    fn test_logging_to_log_config() {
        let section = LoggingSection {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            ansi_enabled: true,
            ..Default::default()
        };

        let config = section.to_log_config();
        assert_eq!(config.level, "debug");
        assert!(!config.json_format);
        assert!(config.ansi);
    }

    #[test]
    fn test_metrics_to_metrics_config() {
        let section = MetricsSection {
            enabled: true,
            addr: "127.0.0.1:9000".to_string(),
        };

        let config = section.to_metrics_config();
        assert!(config.enabled);
        assert_eq!(config.addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_route_options_from_toml() {
        let route: RouteConfig = toml::from_str(
            r#"
            endpoint = "docs"
            handler = "pages"

            [[options.pages]]
            path = "guide/intro"
            body = "<h1>Intro</h1>"
            "#,
        )
        .unwrap();

        assert!(!route.fallback);
        assert_eq!(route.options.pages.len(), 1);
        assert_eq!(route.options.pages[0].path, "guide/intro");
        assert!(route.options.root.is_none());
    }

    #[test]
    fn test_unknown_option_rejected() {
        let result: Result<RouteConfig, _> = toml::from_str(
            r#"
            endpoint = "docs"
            handler = "pages"
            options = { colour = "blue" }
            "#,
        );
        assert!(result.is_err());
    }
}
