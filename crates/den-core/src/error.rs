//! Error types for the request pipeline.
//!
//! Errors raised before transmission never escape the pipeline as faults.
//! They are recorded on the [`PipelineContext`](crate::PipelineContext) and
//! turned into a generic error response:
//!
//! | Error | Raised by | Response |
//! |---|---|---|
//! | [`ProcessError`] | pre-/post-processors | 503 |
//! | [`RouteError`] | endpoint resolution, route handlers | 503 |
//! | [`StreamError`] | body transmission | 503, body truncated |

use http::StatusCode;
use thiserror::Error;

use crate::Stage;

/// Boxed error used to carry handler- or processor-specific causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A pre-processor or post-processor failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProcessError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ProcessError {
    /// Creates a processor error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a processor error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// A routing failure.
#[derive(Debug, Error)]
pub enum RouteError {
    /// No handler is registered for the endpoint and no fallback exists.
    #[error("no handler registered for endpoint '{endpoint}'")]
    NoHandler {
        /// The endpoint that failed to resolve.
        endpoint: String,
    },

    /// The route handler reported a failure.
    #[error("handler for endpoint '{endpoint}' failed: {message}")]
    Handler {
        /// The endpoint whose handler failed.
        endpoint: String,
        /// Human-readable error message.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl RouteError {
    /// Creates a missing-handler error.
    pub fn no_handler(endpoint: impl Into<String>) -> Self {
        Self::NoHandler {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a handler failure.
    pub fn handler(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            endpoint: endpoint.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a handler failure wrapping an underlying cause.
    pub fn handler_with_source(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Handler {
            endpoint: endpoint.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// A failure while copying the response body to the transport.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Reading from the response body failed.
    #[error("failed to read response body: {0}")]
    Read(#[source] std::io::Error),

    /// Writing to the transport failed.
    #[error("failed to write response body: {0}")]
    Write(#[source] std::io::Error),
}

impl StreamError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// The error recorded on a cancelled pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A pre-processor or post-processor failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Routing failed.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A stage ran without the response it depends on.
    #[error("no response available in stage {stage}")]
    MissingResponse {
        /// The stage that found no response.
        stage: Stage,
    },
}

impl PipelineError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Process(err) => err.status_code(),
            Self::Route(err) => err.status_code(),
            Self::MissingResponse { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
