//! Capabilities the pipeline consumes.
//!
//! The [`Router`](crate::Router) depends only on these traits, never on a
//! concrete handler. All three run synchronously with respect to the
//! pipeline: a stage calls them and waits for the result.

use http::Request;

use crate::{Body, ProcessError, RequestInfo, ResponseInfo, RouteError};

/// Answers requests for an endpoint.
///
/// # Example
///
/// ```
/// use den_core::{RequestInfo, ResponseInfo, ResponseType, RouteError, RouteHandler};
/// use http::StatusCode;
///
/// struct Hello;
///
/// impl RouteHandler for Hello {
///     fn handle_request(&self, req: RequestInfo) -> Result<ResponseInfo, RouteError> {
///         Ok(ResponseInfo::new(StatusCode::OK, ResponseType::Text, req.endpoint())
///             .with_body("Hello, world!"))
///     }
/// }
/// ```
pub trait RouteHandler: Send + Sync + 'static {
    /// Produces a response for the request.
    fn handle_request(&self, req: RequestInfo) -> Result<ResponseInfo, RouteError>;
}

/// Inspects or rewrites a raw request before routing.
pub trait RequestProcessor: Send + Sync + 'static {
    /// Processes the request. An error cancels the pipeline.
    fn process_request(&self, req: &mut Request<Body>) -> Result<(), ProcessError>;
}

/// Rewrites a response after routing.
///
/// Only headers and body are mutable on a [`ResponseInfo`].
pub trait ResponseProcessor: Send + Sync + 'static {
    /// Processes the response in place. An error cancels the pipeline.
    fn process_response(&self, res: &mut ResponseInfo) -> Result<(), ProcessError>;
}

impl<F> RouteHandler for F
where
    F: Fn(RequestInfo) -> Result<ResponseInfo, RouteError> + Send + Sync + 'static,
{
    fn handle_request(&self, req: RequestInfo) -> Result<ResponseInfo, RouteError> {
        self(req)
    }
}

impl<F> RequestProcessor for F
where
    F: Fn(&mut Request<Body>) -> Result<(), ProcessError> + Send + Sync + 'static,
{
    fn process_request(&self, req: &mut Request<Body>) -> Result<(), ProcessError> {
        self(req)
    }
}

impl<F> ResponseProcessor for F
where
    F: Fn(&mut ResponseInfo) -> Result<(), ProcessError> + Send + Sync + 'static,
{
    fn process_response(&self, res: &mut ResponseInfo) -> Result<(), ProcessError> {
        self(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResponseType;
    use http::StatusCode;

    #[test]
    fn test_closure_route_handler() {
        let handler = |req: RequestInfo| -> Result<ResponseInfo, RouteError> {
            Ok(ResponseInfo::new(
                StatusCode::OK,
                ResponseType::Text,
                req.endpoint(),
            ))
        };

        let mut raw = Request::get("/closure/x").body(Body::empty()).unwrap();
        let response = handler
            .handle_request(RequestInfo::from_request(&mut raw))
            .unwrap();

        assert_eq!(response.endpoint(), "closure");
    }

    #[test]
    fn test_closure_processors() {
        let reject =
            |_: &mut Request<Body>| -> Result<(), ProcessError> { Err(ProcessError::new("nope")) };
        let mut raw = Request::get("/").body(Body::empty()).unwrap();
        assert!(reject.process_request(&mut raw).is_err());

        let tag = |res: &mut ResponseInfo| -> Result<(), ProcessError> {
            res.headers.insert(
                http::header::SERVER,
                http::HeaderValue::from_static("den"),
            );
            Ok(())
        };
        let mut response = ResponseInfo::new(StatusCode::OK, ResponseType::Html, "site");
        tag.process_response(&mut response).unwrap();
        assert_eq!(response.headers.get(&http::header::SERVER).unwrap(), "den");
    }
}
