//! HTTP server implementation.
//!
//! Built on Hyper and Tokio. The server owns no routing logic: every request
//! body is collected, then handed to the shared [`Router`] together with a
//! [`BufferedWriter`] that becomes the HTTP response.
//!
//! # Architecture
//!
//! - TCP listener bound to the configured address
//! - One task per connection, served by hyper's HTTP/1.1 connection driver
//! - Request pipeline via [`Router::route_request`]
//! - Graceful shutdown bounded by the shutdown timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use den_core::Router;
//! use den_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .router(Router::new())
//!         .build();
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use den_config::ServerSection;
use den_core::{Body, BufferedWriter, RequestInfo, Router, ENDPOINT_DEFAULT};
use den_telemetry::metrics::record_request;
use den_telemetry::InFlightGuard;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The den HTTP server.
///
/// # Example
///
/// ```rust
/// use den_core::Router;
/// use den_server::Server;
/// use std::time::Duration;
///
/// let server = Server::builder()
///     .http_addr("127.0.0.1:3000")
///     .request_timeout(Duration::from_secs(5))
///     .router(Router::new())
///     .build();
///
/// assert_eq!(server.http_addr(), "127.0.0.1:3000");
/// ```
pub struct Server {
    router: Arc<Router>,
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
}

impl Server {
    /// Creates a server for `router` with default settings.
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self::builder().router(router).build()
    }

    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Returns the shared router.
    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Returns the configured bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the request body timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Runs the server until SIGTERM or SIGINT is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .http_addr
            .parse()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.http_addr.clone(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// triggers, then waits for open connections to finish.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, endpoints = ?self.sorted_endpoints(), "server listening");
        }

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(err) = server.handle_connection(stream, shutdown).await {
                                    tracing::debug!(remote_addr = %remote_addr, error = %err, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to accept connection");
                        }
                    }
                }

                _ = shutdown.recv() => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        drop(listener);

        tracing::info!(
            timeout = ?server.shutdown_timeout,
            connections = tracker.active_connections(),
            "waiting for connections to close"
        );

        tokio::select! {
            _ = tracker.drained() => {
                tracing::info!("all connections closed");
            }
            _ = tokio::time::sleep(server.shutdown_timeout) => {
                tracing::warn!(
                    connections = tracker.active_connections(),
                    "shutdown timeout reached with connections still active"
                );
            }
        }

        tracing::info!("server stopped");
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            _ = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    /// Handles a single HTTP request.
    async fn handle_request<B>(&self, req: Request<B>) -> Result<HttpResponse, Infallible>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: fmt::Display,
    {
        let _in_flight = InFlightGuard::new();
        let started = Instant::now();
        let label = self.metrics_label(&req);

        let (parts, body) = req.into_parts();

        let response = match tokio::time::timeout(self.request_timeout, body.collect()).await {
            Ok(Ok(collected)) => {
                let request = Request::from_parts(parts, Body::from_bytes(collected.to_bytes()));
                let mut writer = BufferedWriter::new();
                self.router.route_request(request, &mut writer).await;
                writer.into_response().map(Full::new)
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "failed to read request body");
                plain_response(StatusCode::BAD_REQUEST, "failed to read request body")
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.request_timeout, "request body timed out");
                plain_response(StatusCode::REQUEST_TIMEOUT, "request body timed out")
            }
        };

        record_request(&label, response.status().as_u16(), started.elapsed());
        Ok(response)
    }

    // Unknown endpoints share one label so clients cannot grow the series.
    fn metrics_label<B>(&self, req: &Request<B>) -> String {
        let endpoint = RequestInfo::endpoint_for(req);
        if self.router.has_route(&endpoint) {
            endpoint
        } else {
            ENDPOINT_DEFAULT.to_string()
        }
    }

    fn sorted_endpoints(&self) -> Vec<&str> {
        let mut endpoints: Vec<&str> = self.router.endpoints().collect();
        endpoints.sort_unstable();
        endpoints
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("http_addr", &self.http_addr)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("router", &self.router)
            .finish()
    }
}

fn plain_response(status: StatusCode, message: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Builder for configuring and creating a [`Server`].
#[derive(Debug, Default)]
pub struct ServerBuilder {
    router: Option<Router>,
    http_addr: Option<String>,
    shutdown_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl ServerBuilder {
    /// Creates a new server builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes address and timeouts from a server configuration section.
    #[must_use]
    pub fn config(self, section: &ServerSection) -> Self {
        self.http_addr(section.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(section.shutdown_timeout_secs))
            .request_timeout(Duration::from_millis(section.request_timeout_ms))
    }

    /// Sets the router that answers requests.
    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the HTTP bind address (e.g., "0.0.0.0:8080").
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = Some(addr.into());
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Sets how long a client may take to send the request body.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the server. Unset values take their defaults.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            router: Arc::new(self.router.unwrap_or_default()),
            http_addr: self
                .http_addr
                .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
            shutdown_timeout: self.shutdown_timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid address '{addr}': {source}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to the configured address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use den_core::fixtures::{FailingHandler, TextHandler};
    use std::fs;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::files::FileHandler;

    struct Running {
        addr: SocketAddr,
        shutdown: ShutdownSignal,
        handle: tokio::task::JoinHandle<()>,
    }

    async fn start(server: Server) -> Running {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let handle = tokio::spawn(server.serve(listener, shutdown.clone()));
        Running {
            addr,
            shutdown,
            handle,
        }
    }

    // Reads one response: headers, then Content-Length bytes of body.
    async fn read_response(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    async fn send_raw(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), read_response(&mut stream))
            .await
            .unwrap()
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        send_raw(
            addr,
            &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
        )
        .await
    }

    #[test]
    fn test_server_builder_defaults() {
        let server = Server::builder().build();

        assert_eq!(server.http_addr(), "0.0.0.0:8080");
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(server.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_server_builder_from_config() {
        let section = ServerSection {
            http_addr: "127.0.0.1:9000".to_string(),
            shutdown_timeout_secs: 5,
            request_timeout_ms: 250,
            ..Default::default()
        };

        let server = Server::builder().config(&section).build();

        assert_eq!(server.http_addr(), "127.0.0.1:9000");
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(server.request_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:80".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(err.to_string().contains("failed to bind to 127.0.0.1:80"));
    }

    #[tokio::test]
    async fn test_server_run_invalid_address() {
        let server = Server::builder().http_addr("not-a-valid-address").build();

        let result = server.run_with_shutdown(ShutdownSignal::new()).await;

        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_server_run_and_shutdown() {
        let server = Server::builder()
            .http_addr("127.0.0.1:0")
            .shutdown_timeout(Duration::from_millis(100))
            .build();

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result =
            tokio::time::timeout(Duration::from_secs(5), server.run_with_shutdown(shutdown)).await;

        assert!(result.is_ok());
        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_handle_request_runs_pipeline() {
        let mut router = Router::new();
        router.route("hello", TextHandler::new("Hello, world!"));
        router.route("broken", FailingHandler::new("boom"));
        let server = Server::new(router);

        let response = server
            .handle_request(Request::get("/hello").body(Full::new(Bytes::new())).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Hello, world!");

        let response = server
            .handle_request(Request::get("/broken").body(Full::new(Bytes::new())).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_metrics_label_bounds_unknown_endpoints() {
        let mut router = Router::new();
        router.route("blog", TextHandler::new("blog"));
        let server = Server::new(router);

        let known = Request::get("/blog/post").body(()).unwrap();
        let unknown = Request::get("/random-1234").body(()).unwrap();

        assert_eq!(server.metrics_label(&known), "blog");
        assert_eq!(server.metrics_label(&unknown), ENDPOINT_DEFAULT);
    }

    #[tokio::test]
    async fn test_serves_files_over_tcp() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("test_file"), "Hello, world!").unwrap();

        let mut router = Router::new();
        router.route("test", FileHandler::new(dir.path()));
        let running = start(Server::new(router)).await;

        let response = get(running.addr, "/test/test_file").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("Hello, world!"), "{response}");

        let response = get(running.addr, "/test/../../../").await;
        assert!(response.starts_with("HTTP/1.1 403"), "{response}");

        running.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), running.handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_body_reaches_handler() {
        let mut router = Router::new();
        router.route(
            "echo",
            |mut req: RequestInfo| -> Result<den_core::ResponseInfo, den_core::RouteError> {
                Ok(den_core::ResponseInfo::new(
                    StatusCode::OK,
                    den_core::ResponseType::Text,
                    req.endpoint(),
                )
                .with_body(req.take_body()))
            },
        );
        let running = start(Server::new(router)).await;

        let response = send_raw(
            running.addr,
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\nConnection: close\r\n\r\nping",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("ping"), "{response}");

        running.shutdown.trigger();
    }

    #[tokio::test]
    async fn test_slow_body_times_out() {
        let server = Server::builder()
            .request_timeout(Duration::from_millis(50))
            .build();
        let running = start(server).await;

        // Promise a body that never arrives.
        let response = send_raw(
            running.addr,
            "POST /x HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 408"), "{response}");
        assert!(response.ends_with("request body timed out"), "{response}");

        running.shutdown.trigger();
    }
}
