//! Observability for den.
//!
//! - **Logging**: structured logs through `tracing`, as JSON or pretty text
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  den server                  │
//! │                                              │
//! │   tracing::info!(..)        counter!(..)     │
//! │          │                        │          │
//! │  ┌───────┴────────────────────────┴───────┐  │
//! │  │             den-telemetry              │  │
//! │  │   ┌─────────────┐   ┌─────────────┐    │  │
//! │  │   │   Logging   │   │   Metrics   │    │  │
//! │  │   │ (JSON/text) │   │ (Prometheus)│    │  │
//! │  │   └──────┬──────┘   └──────┬──────┘    │  │
//! │  └──────────┼─────────────────┼───────────┘  │
//! └─────────────┼─────────────────┼──────────────┘
//!               ▼                 ▼
//!         ┌──────────┐      ┌──────────┐
//!         │ stdout   │      │ /metrics │
//!         └──────────┘      └──────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use den_telemetry::{init_telemetry, LogConfig, MetricsConfig};
//!
//! init_telemetry(&LogConfig::default(), &MetricsConfig::default())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use self::metrics::{init_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(logging: &LogConfig, metrics: &MetricsConfig) -> TelemetryResult<()> {
    init_logging(logging)?;
    init_metrics(metrics)?;
    Ok(())
}
