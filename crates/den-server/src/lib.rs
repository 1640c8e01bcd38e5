//! # Den Server
//!
//! The outer layer of the den framework:
//!
//! - [`Server`] - HTTP/1.1 listener via Hyper with graceful shutdown
//! - [`files::FileHandler`] - Static files below a base directory
//! - [`registry::HandlerRegistry`] - Named handler factories used to build a
//!   [`Router`](den_core::Router) from configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use den_config::ConfigLoader;
//! use den_server::{build_router, HandlerRegistry, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_file("den.toml")?.load()?;
//!     let router = build_router(&config, &HandlerRegistry::with_builtins())?;
//!
//!     Server::builder()
//!         .config(&config.server)
//!         .router(router)
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/den-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod files;
pub mod registry;
mod server;
pub mod shutdown;

pub use files::{FileHandler, FileHandlerError};
pub use registry::{build_router, HandlerFactory, HandlerRegistry, RegistryError};
pub use server::{HttpResponse, ResponseBody, Server, ServerBuilder, ServerError};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
