//! Named handler factories.
//!
//! Configuration names handlers by string (`handler = "files"`). The
//! [`HandlerRegistry`] maps those names to factories that build a
//! [`RouteHandler`] from typed [`HandlerOptions`]. It is consulted once, at
//! startup, by [`build_router`]; the pipeline never sees it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use den_config::{DenConfig, HandlerOptions};
use den_core::{RouteHandler, Router, ENDPOINT_DEFAULT};
use den_tree::{PageTree, PageTreeHandler, SinglePage};
use thiserror::Error;

use crate::files::FileHandler;

/// Builds a handler from its configured options.
pub type HandlerFactory = fn(&HandlerOptions) -> Result<Arc<dyn RouteHandler>, RegistryError>;

/// Errors raised while registering or building handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A factory with this name is already registered.
    #[error("`{name}` was already stored in the handler registry")]
    AlreadyRegistered {
        /// The duplicated name.
        name: String,
    },

    /// No factory is registered under this name.
    #[error("no handler named `{name}` in the handler registry")]
    UnknownHandler {
        /// The requested name.
        name: String,
    },

    /// The factory rejected its options.
    #[error("invalid options for handler `{handler}`: {reason}")]
    InvalidOptions {
        /// The handler name.
        handler: String,
        /// Why the options were rejected.
        reason: String,
    },
}

impl RegistryError {
    /// Create a new invalid options error.
    pub fn invalid_options(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}

/// Write-once mapping from handler names to factories.
///
/// # Example
///
/// ```rust
/// use den_config::HandlerOptions;
/// use den_server::registry::HandlerRegistry;
///
/// let registry = HandlerRegistry::with_builtins();
/// assert!(registry.contains("files"));
///
/// let options = HandlerOptions {
///     root: Some("./public".into()),
///     ..Default::default()
/// };
/// assert!(registry.build("files", &options).is_ok());
/// ```
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `files` and `pages` factories.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.factories.insert("files".to_string(), files_factory);
        registry.factories.insert("pages".to_string(), pages_factory);
        registry
    }

    /// Registers a factory under `name`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyRegistered` if the name is taken; the
    /// existing factory is kept.
    pub fn add(&mut self, name: impl Into<String>, factory: HandlerFactory) -> Result<(), RegistryError> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered { name });
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Returns `true` if a factory is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownHandler` for an unregistered name, or
    /// the factory's own error.
    pub fn build(
        &self,
        name: &str,
        options: &HandlerOptions,
    ) -> Result<Arc<dyn RouteHandler>, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownHandler {
                name: name.to_string(),
            })?;
        factory(options)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Builds a [`Router`] from the configured routes.
///
/// Routes are registered in order. A route marked as fallback is also
/// registered under the reserved default endpoint.
///
/// # Errors
///
/// Returns the first `RegistryError` raised while building a handler.
pub fn build_router(config: &DenConfig, registry: &HandlerRegistry) -> Result<Router, RegistryError> {
    let mut router = Router::new().with_chunk_size(config.server.chunk_size);

    for route in &config.routes {
        let handler = registry.build(&route.handler, &route.options)?;

        if route.fallback {
            router.route_shared(ENDPOINT_DEFAULT, Arc::clone(&handler));
        }
        router.route_shared(route.endpoint.clone(), handler);

        tracing::info!(
            endpoint = %route.endpoint,
            handler = %route.handler,
            fallback = route.fallback,
            "route registered"
        );
    }

    Ok(router)
}

fn files_factory(options: &HandlerOptions) -> Result<Arc<dyn RouteHandler>, RegistryError> {
    let root = options
        .root
        .as_ref()
        .ok_or_else(|| RegistryError::invalid_options("files", "`root` is required"))?;

    let mut handler = FileHandler::new(root);
    if let Some(index) = &options.index {
        handler = handler.index(index);
    }

    Ok(Arc::new(handler))
}

fn pages_factory(options: &HandlerOptions) -> Result<Arc<dyn RouteHandler>, RegistryError> {
    let mut tree = PageTree::new();

    for page in &options.pages {
        let segments: Vec<&str> = page.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(name) = segments.last() else {
            return Err(RegistryError::invalid_options(
                "pages",
                "page path must not be empty",
            ));
        };
        tree.add_path(&segments[..], SinglePage::new(*name, page.body.clone()));
    }

    Ok(Arc::new(PageTreeHandler::new(tree)))
}
