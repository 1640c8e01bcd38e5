//! Test fixtures for den development and testing.
//!
//! Small handlers and processors with predictable behavior, used by the
//! tests of this crate and of the crates built on it.
//!
//! # Example
//!
//! ```
//! use den_core::fixtures::TextHandler;
//! use den_core::{Body, Router};
//! use http::{Request, StatusCode};
//!
//! let mut router = Router::new();
//! router.route("test", TextHandler::new("Hello, world!"));
//!
//! # tokio_test::block_on(async {
//! let request = Request::get("https://test.org/test/path/").body(Body::empty()).unwrap();
//! let response = router.handle(request).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Request, StatusCode};
use tokio::io::AsyncWrite;

use crate::{
    Body, ProcessError, RequestInfo, RequestProcessor, ResponseInfo, ResponseProcessor,
    ResponseType, ResponseWriter, RouteError, RouteHandler,
};

/// Answers every request with a fixed 200 text response and counts calls.
#[derive(Debug, Clone)]
pub struct TextHandler {
    text: String,
    calls: Arc<AtomicUsize>,
}

impl TextHandler {
    /// Creates a handler answering with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the shared call counter.
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl RouteHandler for TextHandler {
    fn handle_request(&self, req: RequestInfo) -> Result<ResponseInfo, RouteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(
            ResponseInfo::new(StatusCode::OK, ResponseType::Text, req.endpoint())
                .with_body(self.text.clone()),
        )
    }
}

/// Fails every request with a handler error.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    /// Creates a handler failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl RouteHandler for FailingHandler {
    fn handle_request(&self, req: RequestInfo) -> Result<ResponseInfo, RouteError> {
        Err(RouteError::handler(req.endpoint(), self.message.clone()))
    }
}

/// A pre-processor that always fails.
#[derive(Debug, Clone)]
pub struct FailingRequestProcessor {
    message: String,
}

impl FailingRequestProcessor {
    /// Creates a pre-processor failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl RequestProcessor for FailingRequestProcessor {
    fn process_request(&self, _req: &mut Request<Body>) -> Result<(), ProcessError> {
        Err(ProcessError::new(self.message.clone()))
    }
}

/// A post-processor that always fails.
#[derive(Debug, Clone)]
pub struct FailingResponseProcessor {
    message: String,
}

impl FailingResponseProcessor {
    /// Creates a post-processor failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ResponseProcessor for FailingResponseProcessor {
    fn process_response(&self, _res: &mut ResponseInfo) -> Result<(), ProcessError> {
        Err(ProcessError::new(self.message.clone()))
    }
}

/// A post-processor that appends one header value.
#[derive(Debug, Clone)]
pub struct HeaderTagger {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderTagger {
    /// Creates a post-processor appending `name: value`.
    #[must_use]
    pub fn new(name: HeaderName, value: &'static str) -> Self {
        Self {
            name,
            value: HeaderValue::from_static(value),
        }
    }
}

impl ResponseProcessor for HeaderTagger {
    fn process_response(&self, res: &mut ResponseInfo) -> Result<(), ProcessError> {
        res.headers.append(self.name.clone(), self.value.clone());
        Ok(())
    }
}

/// Returns a pre-processor that only counts the requests it sees.
pub fn counting_request_processor() -> (impl RequestProcessor, Arc<AtomicUsize>) {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let processor = move |_: &mut Request<Body>| -> Result<(), ProcessError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    };
    (processor, seen)
}

/// A [`ResponseWriter`] whose body writes always fail.
#[derive(Debug, Default)]
pub struct FailingWriter {
    /// Headers set by the send stage.
    pub headers: HeaderMap,
    /// Every status written, in order.
    pub statuses: Vec<StatusCode>,
}

impl ResponseWriter for FailingWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.statuses.push(status);
    }
}

impl AsyncWrite for FailingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "connection closed",
        )))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// What a [`RecordingWriter`] saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterEvent {
    /// A body write of this many bytes.
    Write(usize),
    /// A flush of the body.
    Flush,
    /// A status write.
    Status(StatusCode),
}

/// A [`ResponseWriter`] that logs every write, flush and status.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    /// Headers set by the send stage.
    pub headers: HeaderMap,
    /// The body bytes received.
    pub body: Vec<u8>,
    /// Every call, in order.
    pub events: Vec<WriterEvent>,
}

impl RecordingWriter {
    /// Returns the size of each body write.
    pub fn write_sizes(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|event| match event {
                WriterEvent::Write(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl ResponseWriter for RecordingWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.events.push(WriterEvent::Status(status));
    }
}

impl AsyncWrite for RecordingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.body.extend_from_slice(buf);
        this.events.push(WriterEvent::Write(buf.len()));
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().events.push(WriterEvent::Flush);
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_info(uri: &str) -> RequestInfo {
        let mut raw = Request::get(uri).body(Body::empty()).unwrap();
        RequestInfo::from_request(&mut raw)
    }

    #[test]
    fn test_text_handler_counts_calls() {
        let handler = TextHandler::new("hi");
        let calls = handler.calls();

        handler.handle_request(request_info("/a")).unwrap();
        handler.handle_request(request_info("/b")).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failing_handler_names_endpoint() {
        let err = FailingHandler::new("boom")
            .handle_request(request_info("/blog/post"))
            .unwrap_err();
        assert_eq!(err.to_string(), "handler for endpoint 'blog' failed: boom");
    }
}
