//! Static file serving.
//!
//! [`FileHandler`] answers requests for an endpoint by joining the request's
//! path segments onto a base directory.
//!
//! # Example
//!
//! ```rust
//! use den_core::Router;
//! use den_server::files::FileHandler;
//!
//! let mut router = Router::new();
//! router.route("static", FileHandler::new("./public").index("index.html"));
//! ```
//!
//! # Security
//!
//! - Only plain path segments are accepted (`..`, `.` and roots are refused)
//! - The joined path must be absolute and stay under the base directory
//! - Only `GET` is served

use std::fs::{File, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};

use den_core::{Body, RequestInfo, ResponseInfo, ResponseType, RouteError, RouteHandler};
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use http::{Method, StatusCode};
use thiserror::Error;

/// Errors that can occur when serving static files.
#[derive(Debug, Error)]
pub enum FileHandlerError {
    /// The file could not be opened or inspected.
    #[error("cannot open '{path}': {source}")]
    Access {
        /// Requested path, relative to the base directory.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The requested path would leave the base directory.
    #[error("access to '{path}' is not allowed")]
    NotAllowed {
        /// Requested path, relative to the base directory.
        path: String,
    },

    /// A directory was requested and no index file is configured.
    #[error("'{path}' is a directory")]
    IsDirectory {
        /// Requested path, relative to the base directory.
        path: String,
    },

    /// The request method is not `GET`.
    #[error("invalid method")]
    InvalidMethod {
        /// The rejected method.
        method: Method,
    },
}

impl FileHandlerError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Access { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::NotAllowed { .. } => StatusCode::FORBIDDEN,
            Self::IsDirectory { .. } => StatusCode::NOT_FOUND,
            Self::InvalidMethod { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

/// Serves files below a base directory.
///
/// Failures are answered with a plain-text response carrying the error
/// message and the matching status; they never cancel the pipeline.
#[derive(Debug, Clone)]
pub struct FileHandler {
    base: PathBuf,
    index: Option<String>,
}

impl FileHandler {
    /// Creates a handler for `base`.
    ///
    /// A relative base is anchored to the current working directory now, so
    /// later changes of the working directory do not move it.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let base = if base.is_absolute() {
            base
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(base),
                Err(err) => {
                    tracing::warn!(base = %base.display(), error = %err, "cannot anchor relative file root");
                    base
                }
            }
        };

        Self { base, index: None }
    }

    /// Serves `name` when a directory is requested.
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the index file name, if any.
    #[must_use]
    pub fn index_file(&self) -> Option<&str> {
        self.index.as_deref()
    }

    fn serve(&self, req: &RequestInfo) -> Result<ResponseInfo, FileHandlerError> {
        if req.method() != Method::GET {
            return Err(FileHandlerError::InvalidMethod {
                method: req.method().clone(),
            });
        }

        let display = req.path().join("/");
        let mut path = self.resolve(req.path(), &display)?;

        let (mut file, mut metadata) = open(&path, &display)?;

        if metadata.is_dir() {
            let Some(index) = &self.index else {
                return Err(FileHandlerError::IsDirectory { path: display });
            };
            path.push(index);
            (file, metadata) = open(&path, &display)?;
            if metadata.is_dir() {
                return Err(FileHandlerError::IsDirectory { path: display });
            }
        }

        tracing::debug!(endpoint = %req.endpoint(), file = %path.display(), size = metadata.len(), "serving file");

        let mut response = ResponseInfo::new(StatusCode::OK, ResponseType::Data, req.endpoint())
            .with_header(CONTENT_TYPE, HeaderValue::from_static(content_type(&path)))
            .with_header(CONTENT_LENGTH, HeaderValue::from(metadata.len()));

        if let Some(value) = metadata
            .modified()
            .ok()
            .and_then(|modified| HeaderValue::from_str(&httpdate::fmt_http_date(modified)).ok())
        {
            response = response.with_header(LAST_MODIFIED, value);
        }

        Ok(response.with_body(Body::from_reader(tokio::fs::File::from_std(file))))
    }

    fn resolve(&self, segments: &[String], display: &str) -> Result<PathBuf, FileHandlerError> {
        let mut path = self.base.clone();

        for segment in segments.iter().filter(|s| !s.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(name)), None) => path.push(name),
                _ => {
                    return Err(FileHandlerError::NotAllowed {
                        path: display.to_string(),
                    })
                }
            }
        }

        if !path.is_absolute() || !path.starts_with(&self.base) {
            return Err(FileHandlerError::NotAllowed {
                path: display.to_string(),
            });
        }

        Ok(path)
    }
}

impl RouteHandler for FileHandler {
    fn handle_request(&self, req: RequestInfo) -> Result<ResponseInfo, RouteError> {
        match self.serve(&req) {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::debug!(endpoint = %req.endpoint(), error = %err, "file request refused");
                Ok(
                    ResponseInfo::new(err.status_code(), ResponseType::Text, req.endpoint())
                        .with_header(
                            CONTENT_TYPE,
                            HeaderValue::from_static("text/plain; charset=utf-8"),
                        )
                        .with_body(err.to_string()),
                )
            }
        }
    }
}

fn open(path: &Path, display: &str) -> Result<(File, Metadata), FileHandlerError> {
    let access = |source| FileHandlerError::Access {
        path: display.to_string(),
        source,
    };

    let file = File::open(path).map_err(access)?;
    let metadata = file.metadata().map_err(access)?;
    Ok((file, metadata))
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Archives and documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",

        // Media
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use den_core::Router;
    use http::Request;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("test_file"), "Hello, world!").unwrap();
        fs::write(dir.path().join("style.css"), "body { color: red }").unwrap();

        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("index.html"), "<html>Index</html>").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        dir
    }

    fn router(handler: FileHandler) -> Router {
        let mut router = Router::new();
        router.route("test", handler);
        router
    }

    async fn fetch(router: &Router, method: Method, uri: &str) -> http::Response<bytes::Bytes> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        router.handle(request).await
    }

    #[tokio::test]
    async fn test_serves_file() {
        let dir = create_test_dir();
        let router = router(FileHandler::new(dir.path()));

        let response = fetch(&router, Method::GET, "/test/test_file").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"Hello, world!");
        assert_eq!(response.headers()[CONTENT_LENGTH], "13");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");
        assert!(response.headers().contains_key(LAST_MODIFIED));
    }

    #[tokio::test]
    async fn test_content_type_from_extension() {
        let dir = create_test_dir();
        let router = router(FileHandler::new(dir.path()));

        let response = fetch(&router, Method::GET, "/test/style.css").await;

        assert_eq!(response.headers()[CONTENT_TYPE], "text/css; charset=utf-8");
    }

    #[tokio::test]
    async fn test_traversal_is_forbidden() {
        let dir = create_test_dir();
        let router = router(FileHandler::new(dir.path()));

        for uri in ["/test/../../../", "/test/sub/../test_file", "/test/./test_file"] {
            let response = fetch(&router, Method::GET, uri).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = create_test_dir();
        let router = router(FileHandler::new(dir.path()));

        let response = fetch(&router, Method::GET, "/test/missing.txt").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(String::from_utf8_lossy(response.body()).contains("missing.txt"));
    }

    #[tokio::test]
    async fn test_non_get_is_400() {
        let dir = create_test_dir();
        let router = router(FileHandler::new(dir.path()));

        let response = fetch(&router, Method::POST, "/test/test_file").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(&response.body()[..], b"invalid method");
    }

    #[tokio::test]
    async fn test_directory_with_index() {
        let dir = create_test_dir();
        let router = router(FileHandler::new(dir.path()).index("index.html"));

        let response = fetch(&router, Method::GET, "/test/sub").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"<html>Index</html>");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn test_directory_without_index_is_404() {
        let dir = create_test_dir();

        let plain = router(FileHandler::new(dir.path()));
        let response = fetch(&plain, Method::GET, "/test/sub").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let indexed = router(FileHandler::new(dir.path()).index("index.html"));
        let response = fetch(&indexed, Method::GET, "/test/empty").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_relative_base_is_anchored() {
        let handler = FileHandler::new("public");
        assert!(handler.base().is_absolute());
        assert!(handler.base().ends_with("public"));
        assert!(handler.index_file().is_none());
    }

    #[test]
    fn test_error_status_codes() {
        let access = |kind| FileHandlerError::Access {
            path: "x".to_string(),
            source: io::Error::new(kind, "boom"),
        };

        assert_eq!(
            access(io::ErrorKind::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            access(io::ErrorKind::PermissionDenied).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            access(io::ErrorKind::Other).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            FileHandlerError::NotAllowed {
                path: "..".to_string()
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_content_type_table() {
        assert_eq!(content_type(Path::new("a.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("a.wasm")), "application/wasm");
        assert_eq!(content_type(Path::new("Makefile")), "application/octet-stream");
    }
}
