//! Main configuration types.
//!
//! This module provides the top-level [`DenConfig`] struct and its builder.

use std::collections::HashSet;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoggingSection, MetricsSection, RouteConfig, ServerSection};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete den server configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use den_config::DenConfig;
///
/// let config = DenConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.routes.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DenConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsSection,

    /// Routes, in registration order.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl DenConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use den_config::{DenConfig, RouteConfig, ServerSection};
    ///
    /// let config = DenConfig::builder()
    ///     .server(ServerSection {
    ///         http_addr: "127.0.0.1:3000".to_string(),
    ///         ..Default::default()
    ///     })
    ///     .route(RouteConfig::new("static", "files"))
    ///     .build();
    ///
    /// assert_eq!(config.routes.len(), 1);
    /// ```
    #[must_use]
    pub fn builder() -> DenConfigBuilder {
        DenConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` or `ConfigError::ValidationError` if:
    /// - The server or enabled metrics address is not a socket address
    /// - The chunk size is zero
    /// - The log level is unknown
    /// - A route endpoint is repeated or a route names no handler
    /// - More than one route is marked as fallback
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.chunk_size == 0 {
            return Err(ConfigError::invalid_value(
                "server.chunk_size",
                "must be greater than 0",
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!(
                    "expected one of {}, got '{}'",
                    LOG_LEVELS.join(", "),
                    self.logging.level
                ),
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        self.validate_routes()
    }

    fn validate_routes(&self) -> Result<(), ConfigError> {
        let mut endpoints = HashSet::new();
        let mut fallback: Option<&str> = None;

        for route in &self.routes {
            if !endpoints.insert(route.endpoint.as_str()) {
                return Err(ConfigError::validation_error(format!(
                    "endpoint '{}' is configured more than once",
                    route.endpoint
                )));
            }

            if route.handler.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    format!("routes.{}.handler", route.endpoint),
                    "must name a registered handler",
                ));
            }

            if route.fallback {
                if let Some(previous) = fallback {
                    return Err(ConfigError::validation_error(format!(
                        "routes '{previous}' and '{}' are both marked as fallback",
                        route.endpoint
                    )));
                }
                fallback = Some(route.endpoint.as_str());
            }
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, colored debug logs.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = crate::LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config
    }
}

/// Builder for [`DenConfig`].
#[derive(Debug, Default)]
pub struct DenConfigBuilder {
    server: Option<ServerSection>,
    logging: Option<LoggingSection>,
    metrics: Option<MetricsSection>,
    routes: Vec<RouteConfig>,
}

impl DenConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerSection) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingSection) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsSection) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Append a route.
    #[must_use]
    pub fn route(mut self, route: RouteConfig) -> Self {
        self.routes.push(route);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections use their default values.
    #[must_use]
    pub fn build(self) -> DenConfig {
        DenConfig {
            server: self.server.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
            routes: self.routes,
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<DenConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DenConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_http_addr() {
        let config = DenConfig::builder()
            .server(ServerSection {
                http_addr: "localhost".to_string(),
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.http_addr"));
    }

    #[test]
    fn test_zero_chunk_size() {
        let config = DenConfig::builder()
            .server(ServerSection {
                chunk_size: 0,
                ..Default::default()
            })
            .build();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "server.chunk_size"
        ));
    }

    #[test]
    fn test_unknown_log_level() {
        let config = DenConfig::builder()
            .logging(LoggingSection {
                level: "verbose".to_string(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let config = DenConfig::builder()
            .logging(LoggingSection {
                level: "WARN".to_string(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metrics_addr_checked_only_when_enabled() {
        let disabled = DenConfig::builder()
            .metrics(MetricsSection {
                enabled: false,
                addr: "nope".to_string(),
            })
            .build();
        assert!(disabled.validate().is_ok());

        let enabled = DenConfig::builder()
            .metrics(MetricsSection {
                enabled: true,
                addr: "nope".to_string(),
            })
            .build();
        assert!(enabled.validate().is_err());
    }

    #[test]
    fn test_duplicate_endpoint_rejected() {
        let config = DenConfig::builder()
            .route(RouteConfig::new("blog", "pages"))
            .route(RouteConfig::new("blog", "files"))
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'blog'"));
    }

    #[test]
    fn test_empty_handler_rejected() {
        let config = DenConfig::builder()
            .route(RouteConfig::new("blog", " "))
            .build();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_single_fallback_allowed() {
        let mut fallback = RouteConfig::new("site", "pages");
        fallback.fallback = true;

        let config = DenConfig::builder()
            .route(fallback)
            .route(RouteConfig::new("static", "files"))
            .build_validated();

        assert!(config.is_ok());
    }

    #[test]
    fn test_two_fallbacks_rejected() {
        let mut first = RouteConfig::new("site", "pages");
        first.fallback = true;
        let mut second = RouteConfig::new("static", "files");
        second.fallback = true;

        let err = DenConfig::builder()
            .route(first)
            .route(second)
            .build_validated()
            .unwrap_err();

        assert!(err.to_string().contains("fallback"));
    }

    #[test]
    fn test_development_preset() {
        let config = DenConfig::development();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, crate::LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_full_toml() {
        let config: DenConfig = toml::from_str(
            r#"
            [server]
            http_addr = "127.0.0.1:8000"
            chunk_size = 4096

            [logging]
            format = "pretty"

            [[routes]]
            endpoint = "static"
            handler = "files"
            fallback = true
            options = { root = "/srv/www", index = "index.html" }
            "#,
        )
        .unwrap();

        assert_eq!(config.server.chunk_size, 4096);
        assert_eq!(config.server.shutdown_timeout_secs, 30);
        assert_eq!(config.routes[0].options.index.as_deref(), Some("index.html"));
        assert!(config.routes[0].fallback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<DenConfig, _> = toml::from_str("[authorization]\nenabled = true\n");
        assert!(result.is_err());
    }
}
