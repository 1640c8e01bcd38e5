//! Routing view of an inbound request.

use http::header::HOST;
use http::{HeaderMap, Method, Request};
use indexmap::IndexMap;

use crate::Body;

/// Multi-valued query parameters, in the order they appeared.
pub type Query = IndexMap<String, Vec<String>>;

/// The routing view of a request, built once per request in the routing stage.
///
/// The endpoint comes either from the leftmost host label (subdomain style,
/// e.g. `blog.example.com`) or from the first URL path segment (path style,
/// e.g. `example.com/blog/...`). In subdomain style the full path is kept; in
/// path style the first segment is consumed and never repeated in [`path`].
///
/// [`path`]: RequestInfo::path
#[derive(Debug)]
pub struct RequestInfo {
    method: Method,
    endpoint: String,
    path: Vec<String>,
    query: Query,
    headers: HeaderMap,
    body: Body,
}

impl RequestInfo {
    /// Builds the routing view from a raw request.
    ///
    /// The request's body is moved into the returned value; the raw request
    /// is left with an empty body.
    ///
    /// # Example
    ///
    /// ```
    /// use den_core::{Body, RequestInfo};
    ///
    /// let mut req = http::Request::get("http://example.com/blog/posts/1?tag=rust")
    ///     .body(Body::empty())
    ///     .unwrap();
    ///
    /// let info = RequestInfo::from_request(&mut req);
    /// assert_eq!(info.endpoint(), "blog");
    /// assert_eq!(info.path(), ["posts", "1"]);
    /// assert_eq!(info.query_value("tag"), Some("rust"));
    /// ```
    pub fn from_request(req: &mut Request<Body>) -> Self {
        let host = request_host(req);
        let (endpoint, path) = split_endpoint(host, req.uri().path());
        let query = req.uri().query().map(parse_query).unwrap_or_default();

        Self {
            method: req.method().clone(),
            endpoint,
            path,
            query,
            headers: req.headers().clone(),
            body: std::mem::take(req.body_mut()),
        }
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the endpoint this request is routed to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the path segments left after endpoint extraction.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Returns the decoded query parameters.
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the first value of a query parameter.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the endpoint a raw request routes to, without building the
    /// full view or touching its body.
    #[must_use]
    pub fn endpoint_for<B>(req: &Request<B>) -> String {
        split_endpoint(request_host(req), req.uri().path()).0
    }

    /// Moves the request body out. Later calls return an empty body.
    #[must_use]
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }
}

fn request_host<B>(req: &Request<B>) -> &str {
    let host = req
        .uri()
        .host()
        .or_else(|| req.headers().get(HOST).and_then(|v| v.to_str().ok()))
        .unwrap_or("");

    // IPv6 literals keep their brackets; only strip a trailing port.
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

fn split_endpoint(host: &str, path: &str) -> (String, Vec<String>) {
    let segments: Vec<String> = path
        .trim_matches('/')
        .split('/')
        .map(str::to_string)
        .collect();

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 {
        let path = if segments.len() == 1 && segments[0].is_empty() {
            Vec::new()
        } else {
            segments
        };
        return (labels[0].to_string(), path);
    }

    let mut segments = segments.into_iter();
    let endpoint = segments.next().unwrap_or_default();
    (endpoint, segments.collect())
}

fn parse_query(query: &str) -> Query {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();

    let mut map = Query::new();
    for (key, value) in pairs {
        map.entry(key).or_default().push(value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_path_style_endpoint() {
        let mut req = request("http://test.org/test/path/");
        let info = RequestInfo::from_request(&mut req);

        assert_eq!(info.endpoint(), "test");
        assert_eq!(info.path(), ["path"]);
        assert_eq!(info.method(), Method::GET);
    }

    #[test]
    fn test_subdomain_endpoint_keeps_full_path() {
        let mut req = request("http://blog.example.com/posts/42");
        let info = RequestInfo::from_request(&mut req);

        assert_eq!(info.endpoint(), "blog");
        assert_eq!(info.path(), ["posts", "42"]);
    }

    #[test]
    fn test_root_path_yields_root_endpoint() {
        let mut req = request("http://example.com/");
        let info = RequestInfo::from_request(&mut req);

        assert_eq!(info.endpoint(), "");
        assert!(info.path().is_empty());
    }

    #[test]
    fn test_endpoint_for_matches_full_view() {
        for uri in ["http://test.org/test/path", "http://blog.example.com/x", "/"] {
            let mut req = request(uri);
            let endpoint = RequestInfo::endpoint_for(&req);
            assert_eq!(endpoint, RequestInfo::from_request(&mut req).endpoint(), "{uri}");
        }
    }

    #[test]
    fn test_subdomain_root_path_is_empty() {
        let mut req = request("http://docs.example.com/");
        let info = RequestInfo::from_request(&mut req);

        assert_eq!(info.endpoint(), "docs");
        assert!(info.path().is_empty());
    }

    #[test]
    fn test_host_header_used_for_origin_form() {
        let mut req = Request::get("/a/b")
            .header(HOST, HeaderValue::from_static("api.example.com:8080"))
            .body(Body::empty())
            .unwrap();
        let info = RequestInfo::from_request(&mut req);

        assert_eq!(info.endpoint(), "api");
        assert_eq!(info.path(), ["a", "b"]);
    }

    #[test]
    fn test_missing_host_is_path_style() {
        let mut req = request("/files/readme.txt");
        let info = RequestInfo::from_request(&mut req);

        assert_eq!(info.endpoint(), "files");
        assert_eq!(info.path(), ["readme.txt"]);
    }

    #[test]
    fn test_traversal_segments_are_kept_verbatim() {
        let mut req = request("http://test.org/test/../../../");
        let info = RequestInfo::from_request(&mut req);

        assert_eq!(info.endpoint(), "test");
        assert_eq!(info.path(), ["..", "..", ".."]);
    }

    #[test]
    fn test_multi_valued_query() {
        let mut req = request("http://example.com/search?q=rust&tag=a&tag=b%20c");
        let info = RequestInfo::from_request(&mut req);

        assert_eq!(info.query_value("q"), Some("rust"));
        assert_eq!(info.query()["tag"], vec!["a".to_string(), "b c".to_string()]);
        assert_eq!(info.query_value("missing"), None);
    }

    #[tokio::test]
    async fn test_body_moves_out_of_raw_request() {
        let mut req = Request::post("http://example.com/upload")
            .body(Body::from("payload"))
            .unwrap();
        let mut info = RequestInfo::from_request(&mut req);

        assert!(req.body().is_empty());
        let body = info.take_body().into_bytes().await.unwrap();
        assert_eq!(&body[..], b"payload");
        assert!(info.take_body().is_empty());
    }

    #[test]
    fn test_endpoint_never_repeated_in_path() {
        for uri in ["/a/b/c", "/a", "/a//b", "http://x.y/a/b"] {
            let mut req = request(uri);
            let info = RequestInfo::from_request(&mut req);
            assert_ne!(info.path().first().map(String::as_str), Some(info.endpoint()));
        }
    }
}
