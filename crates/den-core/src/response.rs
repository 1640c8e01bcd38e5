//! Response envelopes.
//!
//! A route handler produces a [`ResponseInfo`]. Post-processors may change its
//! headers and body, but never its status code, response type, or origin
//! endpoint. Finalizing it yields the send-only [`ResponseData`].

use std::fmt;

use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use indexmap::IndexMap;

use crate::{Body, ENDPOINT_ERROR};

/// The kind of content a response carries.
///
/// Post-processors are registered per response type, so an HTML rewriter
/// never sees JSON responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// HTML document.
    Html,
    /// Plain text.
    Text,
    /// JSON document.
    Json,
    /// Opaque data, e.g. a file.
    Data,
    /// No particular type.
    None,
}

impl ResponseType {
    /// Returns the lowercase name of this response type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Text => "text",
            Self::Json => "json",
            Self::Data => "data",
            Self::None => "none",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-valued response headers with explicit removal markers.
///
/// A header set to removed is deleted from the outbound response when it is
/// sent, even if the transport added a value of its own. This differs from
/// a header that was never set, which is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: IndexMap<HeaderName, Option<Vec<HeaderValue>>>,
}

impl ResponseHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, clearing any removal marker for the header.
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries
            .entry(name)
            .or_insert(None)
            .get_or_insert_with(Vec::new)
            .push(value);
    }

    /// Replaces all values of a header with a single value.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.insert(name, Some(vec![value]));
    }

    /// Marks a header for removal from the outbound response.
    pub fn remove(&mut self, name: HeaderName) {
        self.entries.insert(name, None);
    }

    /// Returns the values set for a header, or an empty slice.
    #[must_use]
    pub fn get_all(&self, name: &HeaderName) -> &[HeaderValue] {
        self.entries
            .get(name)
            .and_then(Option::as_deref)
            .unwrap_or_default()
    }

    /// Returns the first value set for a header.
    #[must_use]
    pub fn get(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.get_all(name).first()
    }

    /// Returns `true` if the header is marked for removal.
    #[must_use]
    pub fn is_removed(&self, name: &HeaderName) -> bool {
        matches!(self.entries.get(name), Some(None))
    }

    /// Returns the number of headers, removal markers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no header is set or marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over headers in insertion order. `None` marks a removal.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, Option<&[HeaderValue]>)> {
        self.entries
            .iter()
            .map(|(name, values)| (name, values.as_deref()))
    }
}

/// A response produced by a route handler.
///
/// # Example
///
/// ```
/// use den_core::{ResponseInfo, ResponseType};
/// use http::StatusCode;
///
/// let response = ResponseInfo::new(StatusCode::OK, ResponseType::Text, "hello")
///     .with_body("Hello, world!");
///
/// assert_eq!(response.code(), StatusCode::OK);
/// assert_eq!(response.endpoint(), "hello");
/// ```
#[derive(Debug)]
pub struct ResponseInfo {
    code: StatusCode,
    response_type: ResponseType,
    endpoint: String,
    /// Headers to send. Post-processors may add or remove entries.
    pub headers: ResponseHeaders,
    /// Body to send. Post-processors may replace it.
    pub body: Body,
}

impl ResponseInfo {
    /// Creates a response with an empty body and no headers.
    pub fn new(code: StatusCode, response_type: ResponseType, endpoint: impl Into<String>) -> Self {
        Self {
            code,
            response_type,
            endpoint: endpoint.into(),
            headers: ResponseHeaders::new(),
            body: Body::empty(),
        }
    }

    /// Creates the generic error response used when a pipeline is cancelled.
    ///
    /// The response is plain text from the reserved error endpoint, with the
    /// error message as its body.
    pub fn generic_error(code: StatusCode, message: impl Into<String>) -> Self {
        Self::new(code, ResponseType::Text, ENDPOINT_ERROR).with_body(message.into())
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends a header value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Returns the response type.
    #[must_use]
    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// Returns the endpoint that produced this response.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Projects this response into its send-only form.
    ///
    /// No validation happens here.
    #[must_use]
    pub fn finalize(self) -> ResponseData {
        ResponseData {
            code: self.code,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// A finalized response, ready to be sent.
#[derive(Debug)]
pub struct ResponseData {
    code: StatusCode,
    headers: ResponseHeaders,
    body: Body,
}

impl ResponseData {
    /// Returns the status code.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// Splits into status code, headers and body.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, ResponseHeaders, Body) {
        (self.code, self.headers, self.body)
    }
}
