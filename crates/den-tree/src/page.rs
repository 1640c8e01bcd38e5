//! Page handlers stored at the leaves of a [`PageTree`](crate::PageTree).

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use den_core::Body;
use http::StatusCode;
use thiserror::Error;

/// A page lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// No content exists at the path.
    #[error("page '{path}' not found")]
    NotFound {
        /// The `/`-joined path that was looked up.
        path: String,
    },
}

impl PageError {
    /// Creates a not-found error for `path`.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }
}

/// Serves content for the path left over after trie resolution.
pub trait PageHandler: Send + Sync + 'static {
    /// Returns the page at `path`, relative to where the handler is
    /// registered.
    fn page(&self, path: &[String]) -> Result<Body, PageError>;

    /// Lists the relative paths of every page this handler serves.
    fn all_pages(&self) -> Vec<String>;
}

impl<T: PageHandler + ?Sized> PageHandler for Box<T> {
    fn page(&self, path: &[String]) -> Result<Body, PageError> {
        (**self).page(path)
    }

    fn all_pages(&self) -> Vec<String> {
        (**self).all_pages()
    }
}

impl<T: PageHandler + ?Sized> PageHandler for Arc<T> {
    fn page(&self, path: &[String]) -> Result<Body, PageError> {
        (**self).page(path)
    }

    fn all_pages(&self) -> Vec<String> {
        (**self).all_pages()
    }
}

/// One page, served for every path below its registration point.
#[derive(Debug, Clone)]
pub struct SinglePage {
    name: String,
    body: Bytes,
}

impl SinglePage {
    /// Creates a page listed as `name` with the given content.
    pub fn new(name: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Returns the name the page is listed under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PageHandler for SinglePage {
    fn page(&self, _path: &[String]) -> Result<Body, PageError> {
        Ok(Body::from_bytes(self.body.clone()))
    }

    fn all_pages(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

/// A set of pages keyed by their `/`-joined relative path.
///
/// # Example
///
/// ```
/// use den_tree::{MultiPage, PageHandler};
///
/// let pages = MultiPage::new()
///     .with_page("guide/intro", "<h1>Intro</h1>")
///     .with_page("index", "<h1>Home</h1>");
///
/// let path = vec!["guide".to_string(), "intro".to_string()];
/// assert!(pages.page(&path).is_ok());
/// assert_eq!(pages.all_pages(), ["guide/intro", "index"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MultiPage {
    pages: BTreeMap<String, Bytes>,
}

impl MultiPage {
    /// Creates an empty page set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the page at `path`.
    #[must_use]
    pub fn with_page(mut self, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.insert(path, body);
        self
    }

    /// Adds or replaces the page at `path`.
    pub fn insert(&mut self, path: impl Into<String>, body: impl Into<Bytes>) {
        self.pages.insert(path.into(), body.into());
    }

    /// Returns the number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if the set has no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageHandler for MultiPage {
    fn page(&self, path: &[String]) -> Result<Body, PageError> {
        let key = path.join("/");
        self.pages
            .get(&key)
            .map(|body| Body::from_bytes(body.clone()))
            .ok_or_else(|| PageError::not_found(key))
    }

    fn all_pages(&self) -> Vec<String> {
        self.pages.keys().cloned().collect()
    }
}
