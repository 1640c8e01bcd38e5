//! The boundary between the send stage and the HTTP transport.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};
use tokio::io::AsyncWrite;

/// Where the send stage writes a response.
///
/// The body is written through [`AsyncWrite`]. The status is written last,
/// exactly once, after the body has been flushed.
pub trait ResponseWriter: AsyncWrite + Unpin + Send {
    /// Returns the outbound headers.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Records the response status.
    fn write_status(&mut self, status: StatusCode);
}

/// A [`ResponseWriter`] that keeps the whole response in memory.
///
/// # Example
///
/// ```
/// use den_core::{BufferedWriter, ResponseWriter};
/// use http::StatusCode;
/// use tokio::io::AsyncWriteExt;
///
/// # tokio_test::block_on(async {
/// let mut writer = BufferedWriter::new();
/// writer.write_all(b"hi").await.unwrap();
/// writer.write_status(StatusCode::OK);
///
/// let response = writer.into_response();
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(&response.body()[..], b"hi");
/// # });
/// ```
#[derive(Debug, Default)]
pub struct BufferedWriter {
    headers: HeaderMap,
    body: BytesMut,
    status: Option<StatusCode>,
    status_writes: usize,
}

impl BufferedWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the headers written so far.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the body bytes written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the last status written, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns how many times a status was written.
    #[must_use]
    pub fn status_writes(&self) -> usize {
        self.status_writes
    }

    /// Converts into an HTTP response. A missing status becomes 200.
    #[must_use]
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for BufferedWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = Some(status);
        self.status_writes += 1;
    }
}

impl AsyncWrite for BufferedWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.body.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http::HeaderValue;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_buffered_writer_collects_response() {
        let mut writer = BufferedWriter::new();
        writer
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write_all(b"Hello, ").await.unwrap();
        writer.write_all(b"world!").await.unwrap();
        writer.flush().await.unwrap();
        writer.write_status(StatusCode::ACCEPTED);

        assert_eq!(writer.body(), b"Hello, world!");
        assert_eq!(writer.status_writes(), 1);

        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(&response.body()[..], b"Hello, world!");
    }

    #[test]
    fn test_missing_status_defaults_to_ok() {
        let response = BufferedWriter::new().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }
}
