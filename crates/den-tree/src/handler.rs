//! Route handler adapter for page trees.

use std::sync::Arc;

use den_core::{RequestInfo, ResponseInfo, ResponseType, RouteError, RouteHandler};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;

use crate::{PageHandler, PageTree};

/// Answers requests by resolving their path in a [`PageTree`].
///
/// Found pages are sent as 200 HTML. A path with no page is answered with a
/// 404 text response rather than failing the pipeline.
///
/// # Example
///
/// ```
/// use den_core::{Body, Router};
/// use den_tree::{PageTree, PageTreeHandler, SinglePage};
/// use http::{Request, StatusCode};
///
/// let mut tree = PageTree::new();
/// tree.add_path(&["about"], SinglePage::new("", "<p>about</p>"));
///
/// let mut router = Router::new();
/// router.route("site", PageTreeHandler::new(tree));
///
/// # tokio_test::block_on(async {
/// let request = Request::get("/site/about").body(Body::empty()).unwrap();
/// let response = router.handle(request).await;
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct PageTreeHandler<H> {
    tree: Arc<PageTree<H>>,
}

impl<H: PageHandler> PageTreeHandler<H> {
    /// Wraps a tree.
    #[must_use]
    pub fn new(tree: PageTree<H>) -> Self {
        Self {
            tree: Arc::new(tree),
        }
    }

    /// Returns the wrapped tree.
    #[must_use]
    pub fn tree(&self) -> &PageTree<H> {
        &self.tree
    }
}

impl<H: PageHandler> RouteHandler for PageTreeHandler<H> {
    fn handle_request(&self, req: RequestInfo) -> Result<ResponseInfo, RouteError> {
        let (handler, rest) = self.tree.resolve(req.path());

        let page = match handler {
            Some(handler) => handler.page(rest),
            None => {
                tracing::debug!(endpoint = %req.endpoint(), path = ?req.path(), "no page tree match");
                return Ok(not_found(req.endpoint()));
            }
        };

        match page {
            Ok(body) => Ok(
                ResponseInfo::new(StatusCode::OK, ResponseType::Html, req.endpoint())
                    .with_header(
                        CONTENT_TYPE,
                        HeaderValue::from_static("text/html; charset=utf-8"),
                    )
                    .with_body(body),
            ),
            Err(err) => {
                tracing::debug!(endpoint = %req.endpoint(), error = %err, "page lookup failed");
                Ok(not_found(req.endpoint()))
            }
        }
    }
}

fn not_found(endpoint: &str) -> ResponseInfo {
    ResponseInfo::new(StatusCode::NOT_FOUND, ResponseType::Text, endpoint)
        .with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )
        .with_body("page not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MultiPage, SinglePage};
    use den_core::{Body, Router};
    use http::Request;

    fn site() -> Router {
        let mut tree: PageTree<Box<dyn PageHandler>> = PageTree::new();
        tree.add_path(&["about"], Box::new(SinglePage::new("", "<p>about</p>")));
        tree.add_path(
            &["docs"],
            Box::new(MultiPage::new().with_page("guide/intro", "<p>intro</p>")),
        );

        let mut router = Router::new();
        router.route("site", PageTreeHandler::new(tree));
        router
    }

    async fn fetch(router: &Router, uri: &str) -> http::Response<bytes::Bytes> {
        router
            .handle(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    #[tokio::test]
    async fn test_single_page_served_as_html() {
        let response = fetch(&site(), "/site/about/anything").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(&response.body()[..], b"<p>about</p>");
    }

    #[tokio::test]
    async fn test_multi_page_uses_remainder() {
        let response = fetch(&site(), "/site/docs/guide/intro").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"<p>intro</p>");
    }

    #[tokio::test]
    async fn test_unknown_page_is_404() {
        let router = site();

        for uri in ["/site/docs/missing", "/site/nowhere", "/site"] {
            let response = fetch(&router, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(&response.body()[..], b"page not found");
        }
    }
}
