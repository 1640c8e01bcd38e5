//! # Den
//!
//! **Staged HTTP request dispatch**
//!
//! Den routes each request through a fixed pipeline: request processors,
//! a handler chosen by the first path segment, response processors, and a
//! chunked send stage. A failure anywhere before sending cancels the
//! pipeline and the client receives a generic error response.
//!
//! ```text
//! Request → pre-processors → endpoint handler → post-processors → send
//!                 │                 │                  │
//!                 └──── cancel ─────┴──── cancel ──────┴──▶ error response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use den::prelude::*;
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.route("hello", |req: RequestInfo| {
//!         Ok(ResponseInfo::new(StatusCode::OK, ResponseType::Text, req.endpoint())
//!             .with_body("Hello, world!"))
//!     });
//!     router.route("static", FileHandler::new("./public"));
//!
//!     Server::builder()
//!         .http_addr("127.0.0.1:8080")
//!         .router(router)
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/den/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export the pipeline core
pub use den_core as core;

// Re-export the page trie
pub use den_tree as tree;

// Re-export server types
pub use den_server as server;

// Re-export configuration
pub use den_config as config;

// Re-export logging and metrics setup
pub use den_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use den::prelude::*;
/// ```
pub mod prelude {
    pub use den_core::{
        Body, ProcessError, RequestInfo, RequestProcessor, ResponseInfo, ResponseProcessor,
        ResponseType, RouteError, RouteHandler, Router,
    };

    pub use den_tree::{PageTree, PageTreeHandler, SinglePage};

    pub use den_server::{
        build_router, FileHandler, HandlerRegistry, Server, ServerBuilder, ShutdownSignal,
    };

    pub use den_config::{ConfigLoader, DenConfig};
}
