//! Byte-stream bodies carried by requests and responses.
//!
//! A [`Body`] is read at most once. It is either empty, an in-memory
//! buffer, or any [`AsyncRead`] source such as an open file.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// A single-use byte stream.
///
/// # Example
///
/// ```
/// use den_core::Body;
///
/// # tokio_test::block_on(async {
/// let body = Body::from("Hello, world!");
/// let bytes = body.into_bytes().await.unwrap();
/// assert_eq!(&bytes[..], b"Hello, world!");
/// # });
/// ```
#[derive(Default)]
pub struct Body {
    inner: Inner,
}

#[derive(Default)]
enum Inner {
    #[default]
    Empty,
    Buffered(Bytes),
    Stream(Pin<Box<dyn AsyncRead + Send>>),
}

impl Body {
    /// Creates an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a body backed by an in-memory buffer.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: Inner::Buffered(bytes.into()),
        }
    }

    /// Creates a body that streams from an async reader.
    #[must_use]
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            inner: Inner::Stream(Box::pin(reader)),
        }
    }

    /// Returns `true` if the body is known to contain no bytes.
    ///
    /// Streaming bodies always report `false`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.inner {
            Inner::Empty => true,
            Inner::Buffered(bytes) => bytes.is_empty(),
            Inner::Stream(_) => false,
        }
    }

    /// Reads the whole body into memory.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self.inner {
            Inner::Empty => Ok(Bytes::new()),
            Inner::Buffered(bytes) => Ok(bytes),
            Inner::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.inner {
            Inner::Empty => Poll::Ready(Ok(())),
            Inner::Buffered(bytes) => {
                let n = bytes.len().min(buf.remaining());
                buf.put_slice(&bytes[..n]);
                bytes.advance(n);
                Poll::Ready(Ok(()))
            }
            Inner::Stream(reader) => reader.as_mut().poll_read(cx, buf),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Empty => f.write_str("Body::Empty"),
            Inner::Buffered(bytes) => f.debug_tuple("Body::Buffered").field(&bytes.len()).finish(),
            Inner::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from_bytes(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from_bytes(Bytes::from_static(text.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_body() {
        let body = Body::empty();
        assert!(body.is_empty());
        assert!(body.into_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buffered_body_reads_in_pieces() {
        let mut body = Body::from("abcdef");
        let mut chunk = [0u8; 4];

        let n = body.read(&mut chunk).await.unwrap();
        assert_eq!(&chunk[..n], b"abcd");

        let n = body.read(&mut chunk).await.unwrap();
        assert_eq!(&chunk[..n], b"ef");

        let n = body.read(&mut chunk).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_stream_body() {
        let body = Body::from_reader(&b"streamed"[..]);
        assert!(!body.is_empty());
        assert_eq!(&body.into_bytes().await.unwrap()[..], b"streamed");
    }

    #[tokio::test]
    async fn test_moving_out_leaves_empty() {
        let mut body = Body::from("data");
        let taken = std::mem::take(&mut body);
        assert!(body.is_empty());

        // `AsyncReadExt` is in scope; `take` here is the reader adapter.
        let mut limited = String::new();
        taken.take(2).read_to_string(&mut limited).await.unwrap();
        assert_eq!(limited, "da");
    }

    #[test]
    fn test_debug_output() {
        assert_eq!(format!("{:?}", Body::empty()), "Body::Empty");
        assert_eq!(format!("{:?}", Body::from("abc")), "Body::Buffered(3)");
    }
}
