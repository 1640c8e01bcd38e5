//! # Den Core
//!
//! The request-dispatch core of the den HTTP framework.
//!
//! Every request travels through a staged pipeline owned by a per-request
//! [`PipelineContext`]:
//!
//! ```text
//!   request ─▶ Initial ─▶ Routing ─▶ PostProcess ─▶ Send ─▶ Finish
//!              pre-procs   handler    post-procs    chunked
//!                                     + finalize    body copy
//! ```
//!
//! - [`Router`] - Endpoint, pre-processor and post-processor registries plus
//!   the stage driver
//! - [`RequestInfo`] - Parsed request envelope (endpoint, path, query, body)
//! - [`ResponseInfo`] / [`ResponseData`] - Mutable and finalized responses
//! - [`RouteHandler`], [`RequestProcessor`], [`ResponseProcessor`] - The
//!   capabilities the pipeline consumes
//! - [`ResponseWriter`] - The transport boundary used by the send stage
//!
//! Failures before sending never surface as faults: the first error cancels
//! the context and the client receives a generic error response instead.

#![doc(html_root_url = "https://docs.rs/den-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod context;
mod error;
pub mod fixtures;
mod handler;
mod request;
mod response;
mod router;
mod transport;

pub use body::Body;
pub use context::{CancelSignal, PipelineContext, RequestId, Stage};
pub use error::{BoxError, PipelineError, ProcessError, RouteError, StreamError};
pub use handler::{RequestProcessor, ResponseProcessor, RouteHandler};
pub use request::{Query, RequestInfo};
pub use response::{ResponseData, ResponseHeaders, ResponseInfo, ResponseType};
pub use router::{Router, CHUNK_SIZE, ENDPOINT_DEFAULT, ENDPOINT_ERROR, ENDPOINT_ROOT};
pub use transport::{BufferedWriter, ResponseWriter};
