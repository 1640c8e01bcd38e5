//! Typed configuration for den.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are rejected)
//! - Layered loading (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use den_config::ConfigLoader;
//!
//! # fn main() -> Result<(), den_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("den.toml")?
//!     .with_env_prefix("DEN")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! chunk_size = 10240
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [[routes]]
//! endpoint = "static"
//! handler = "files"
//! options = { root = "./public", index = "index.html" }
//!
//! [[routes]]
//! endpoint = "site"
//! handler = "pages"
//! fallback = true
//!
//! [[routes.options.pages]]
//! path = "about"
//! body = "<h1>About</h1>"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Scalar settings can be overridden with `PREFIX__SECTION__KEY`:
//!
//! - `DEN__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `DEN__LOGGING__FORMAT=pretty`
//! - `DEN__METRICS__ENABLED=false`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
