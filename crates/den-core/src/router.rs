//! The request router and pipeline driver.
//!
//! The [`Router`] owns three registries:
//!
//! - endpoint → route handler, plus a fallback under [`ENDPOINT_DEFAULT`]
//! - HTTP method → pre-processors, run in registration order
//! - (response type, endpoint) → post-processors, run in registration order
//!
//! Registration takes `&mut self` and happens during setup. Once the router
//! is shared (usually behind an `Arc`) the registries are read-only, so no
//! lock is taken while requests are processed.
//!
//! For each request, [`Router::route_request`] drives a fresh
//! [`PipelineContext`] through its stages. Every iteration runs one unit of
//! work for the current stage and, concurrently, waits for that unit to
//! either signal the next stage or cancel the context. A cancellation before
//! sending replaces the response with a generic error response and resumes
//! at post-processing, so every request is sent exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::context::{StageSignals, StageSlots};
use crate::{
    Body, BufferedWriter, CancelSignal, PipelineContext, PipelineError, RequestInfo,
    RequestProcessor, ResponseHeaders, ResponseProcessor, ResponseType, ResponseWriter,
    RouteError, RouteHandler, Stage, StreamError,
};

/// Endpoint of requests to `/` on a host without a subdomain.
pub const ENDPOINT_ROOT: &str = "";

/// Endpoint whose handler answers requests no other endpoint matches.
pub const ENDPOINT_DEFAULT: &str = "___DEFAULT___";

/// Endpoint reported by generic error responses.
pub const ENDPOINT_ERROR: &str = "___ERROR___";

/// Default size of the chunks used to copy response bodies.
pub const CHUNK_SIZE: usize = 10 * 1024;

type PostProcessors = HashMap<ResponseType, HashMap<String, Vec<Arc<dyn ResponseProcessor>>>>;

/// Dispatches requests to route handlers through the staged pipeline.
///
/// # Example
///
/// ```
/// use den_core::{Body, RequestInfo, ResponseInfo, ResponseType, RouteError, Router};
/// use http::{Request, StatusCode};
///
/// let mut router = Router::new();
/// router.route("hello", |req: RequestInfo| -> Result<ResponseInfo, RouteError> {
///     Ok(ResponseInfo::new(StatusCode::OK, ResponseType::Text, req.endpoint())
///         .with_body("Hello, world!"))
/// });
///
/// # tokio_test::block_on(async {
/// let request = Request::get("http://example.com/hello").body(Body::empty()).unwrap();
/// let response = router.handle(request).await;
///
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(&response.body()[..], b"Hello, world!");
/// # });
/// ```
pub struct Router {
    routes: HashMap<String, Arc<dyn RouteHandler>>,
    pre_processors: HashMap<Method, Vec<Arc<dyn RequestProcessor>>>,
    post_processors: PostProcessors,
    chunk_size: usize,
}

impl Router {
    /// Creates a router with empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            pre_processors: HashMap::new(),
            post_processors: HashMap::new(),
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Sets the chunk size used when sending bodies. Zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the chunk size used when sending bodies.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Registers the handler for an endpoint, replacing any previous one.
    pub fn route(&mut self, endpoint: impl Into<String>, handler: impl RouteHandler) -> &mut Self {
        self.route_shared(endpoint, Arc::new(handler))
    }

    /// Registers an already shared handler for an endpoint.
    pub fn route_shared(
        &mut self,
        endpoint: impl Into<String>,
        handler: Arc<dyn RouteHandler>,
    ) -> &mut Self {
        let endpoint = endpoint.into();
        if self.routes.insert(endpoint.clone(), handler).is_some() {
            tracing::debug!(endpoint = %endpoint, "replaced route handler");
        }
        self
    }

    /// Registers the handler used when no endpoint matches.
    pub fn fallback(&mut self, handler: impl RouteHandler) -> &mut Self {
        self.route(ENDPOINT_DEFAULT, handler)
    }

    /// Appends a pre-processor for requests with `method`.
    pub fn pre_process(&mut self, method: Method, processor: impl RequestProcessor) -> &mut Self {
        self.pre_processors
            .entry(method)
            .or_default()
            .push(Arc::new(processor));
        self
    }

    /// Appends a post-processor for responses of `response_type` produced by
    /// `endpoint`.
    pub fn post_process(
        &mut self,
        response_type: ResponseType,
        endpoint: impl Into<String>,
        processor: impl ResponseProcessor,
    ) -> &mut Self {
        self.post_processors
            .entry(response_type)
            .or_default()
            .entry(endpoint.into())
            .or_default()
            .push(Arc::new(processor));
        self
    }

    /// Returns `true` if a handler is registered for exactly `endpoint`.
    #[must_use]
    pub fn has_route(&self, endpoint: &str) -> bool {
        self.routes.contains_key(endpoint)
    }

    /// Returns the registered endpoints, in no particular order.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Runs a request through the pipeline into an in-memory response.
    pub async fn handle(&self, request: Request<Body>) -> Response<Bytes> {
        let mut writer = BufferedWriter::new();
        self.route_request(request, &mut writer).await;
        writer.into_response()
    }

    /// Runs a request through the pipeline, writing the response to `writer`.
    ///
    /// Returns the status that was written. Exactly one status is written
    /// per call, whatever fails along the way.
    pub async fn route_request<W: ResponseWriter>(
        &self,
        mut request: Request<Body>,
        writer: &mut W,
    ) -> StatusCode {
        let mut ctx = PipelineContext::new();
        let span = tracing::info_span!(
            "request",
            request_id = %ctx.id(),
            method = %request.method(),
            uri = %request.uri(),
        );

        self.drive(&mut ctx, &mut request, writer)
            .instrument(span)
            .await
    }

    async fn drive<W: ResponseWriter>(
        &self,
        ctx: &mut PipelineContext,
        request: &mut Request<Body>,
        writer: &mut W,
    ) -> StatusCode {
        let mut sent = None;
        let mut watch_cancel = true;

        while ctx.stage() != Stage::Finish {
            let stage = ctx.stage();
            tracing::debug!(%stage, "entering stage");

            let (slots, signals, advanced) = ctx.split();
            let (status, transition) = tokio::join!(
                self.run_stage(stage, slots, signals, request, writer),
                next_transition(advanced, signals.cancel_signal(), watch_cancel),
            );
            if status.is_some() {
                sent = status;
            }

            match transition {
                Transition::Advance(next) => ctx.set_stage(next),
                Transition::Cancelled => {
                    watch_cancel = false;
                    metrics::counter!("den_pipeline_cancellations_total", "stage" => stage.as_str())
                        .increment(1);
                    if let Some(err) = ctx.error() {
                        tracing::warn!(%stage, error = %err, "pipeline cancelled");
                    }
                    ctx.redirect_to_error();
                }
            }
        }

        tracing::debug!(
            elapsed_ms = ctx.started_at().elapsed().as_millis() as u64,
            "pipeline finished"
        );
        sent.unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
    }

    /// One unit of work: runs `stage`, then signals the next stage or
    /// cancels the context. Returns the status if this was the send stage.
    async fn run_stage<W: ResponseWriter>(
        &self,
        stage: Stage,
        slots: &mut StageSlots,
        signals: &StageSignals,
        request: &mut Request<Body>,
        writer: &mut W,
    ) -> Option<StatusCode> {
        let recovering = signals.cancel_signal().is_cancelled();
        let outcome = match stage {
            Stage::Initial => self.pre_process_request(request),
            Stage::Routing => self.route_to_handler(request, slots),
            Stage::PostProcess => self.post_process_response(slots, recovering),
            Stage::Send => {
                let status = self.send(slots, writer).await;
                signals.advance(Stage::Finish).await;
                return Some(status);
            }
            Stage::Finish => Ok(()),
        };

        match outcome {
            Ok(()) => signals.advance(stage.next()).await,
            Err(err) => {
                let message = err.to_string();
                if !signals.cancel(err) {
                    // Already cancelled: keep going with the error response.
                    tracing::warn!(%stage, error = %message, "stage failed while recovering");
                    signals.advance(stage.next()).await;
                }
            }
        }
        None
    }

    fn pre_process_request(&self, request: &mut Request<Body>) -> Result<(), PipelineError> {
        if let Some(processors) = self.pre_processors.get(request.method()) {
            for processor in processors {
                processor.process_request(request)?;
            }
        }
        Ok(())
    }

    fn route_to_handler(
        &self,
        request: &mut Request<Body>,
        slots: &mut StageSlots,
    ) -> Result<(), PipelineError> {
        let info = RequestInfo::from_request(request);
        let handler = self
            .routes
            .get(info.endpoint())
            .or_else(|| self.routes.get(ENDPOINT_DEFAULT))
            .ok_or_else(|| RouteError::no_handler(info.endpoint()))?;

        tracing::debug!(endpoint = %info.endpoint(), path = ?info.path(), "dispatching to handler");
        let response = handler.handle_request(info)?;
        slots.info = Some(response);
        Ok(())
    }

    fn post_process_response(
        &self,
        slots: &mut StageSlots,
        recovering: bool,
    ) -> Result<(), PipelineError> {
        let Some(mut info) = slots.info.take() else {
            return Err(PipelineError::MissingResponse {
                stage: Stage::PostProcess,
            });
        };

        let result = self
            .post_processors
            .get(&info.response_type())
            .and_then(|by_endpoint| by_endpoint.get(info.endpoint()))
            .map_or(Ok(()), |processors| {
                processors
                    .iter()
                    .try_for_each(|processor| processor.process_response(&mut info))
            });

        // While recovering, a failing post-processor must not stop the
        // error response from being sent.
        if result.is_ok() || recovering {
            slots.data = Some(info.finalize());
        }
        result.map_err(PipelineError::from)
    }

    async fn send<W: ResponseWriter>(&self, slots: &mut StageSlots, writer: &mut W) -> StatusCode {
        let Some(data) = slots.data.take() else {
            tracing::error!("no finalized response to send");
            writer.write_status(StatusCode::SERVICE_UNAVAILABLE);
            return StatusCode::SERVICE_UNAVAILABLE;
        };

        let (code, headers, body) = data.into_parts();
        apply_headers(writer.headers_mut(), &headers);

        match copy_body(body, writer, self.chunk_size).await {
            Ok(bytes) => {
                tracing::debug!(status = code.as_u16(), bytes, "response sent");
                writer.write_status(code);
                code
            }
            Err(err) => {
                tracing::error!(error = %err, "response stream aborted");
                let status = err.status_code();
                writer.write_status(status);
                status
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut endpoints: Vec<&str> = self.endpoints().collect();
        endpoints.sort_unstable();
        f.debug_struct("Router")
            .field("endpoints", &endpoints)
            .field("pre_processor_methods", &self.pre_processors.len())
            .field("post_processor_types", &self.post_processors.len())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

enum Transition {
    Advance(Stage),
    Cancelled,
}

/// Waits for the running unit to signal the next stage or, while
/// `watch_cancel` is set, to cancel the context.
async fn next_transition(
    advanced: &mut mpsc::Receiver<Stage>,
    cancel: &CancelSignal,
    watch_cancel: bool,
) -> Transition {
    if watch_cancel {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Transition::Cancelled,
            next = advanced.recv() => Transition::Advance(next.unwrap_or(Stage::Finish)),
        }
    } else {
        Transition::Advance(advanced.recv().await.unwrap_or(Stage::Finish))
    }
}

/// Copies response headers onto the outbound map. Values are appended to
/// whatever the transport already set; a removal marker deletes the header.
fn apply_headers(out: &mut HeaderMap, headers: &ResponseHeaders) {
    for (name, values) in headers.iter() {
        match values {
            Some(values) => {
                for value in values {
                    out.append(name.clone(), value.clone());
                }
            }
            None => {
                out.remove(name);
            }
        }
    }
}

async fn copy_body<W: ResponseWriter>(
    mut body: Body,
    writer: &mut W,
    chunk_size: usize,
) -> Result<u64, StreamError> {
    let mut chunk = vec![0u8; chunk_size];
    let mut total = 0u64;

    loop {
        let n = body.read(&mut chunk).await.map_err(StreamError::Read)?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&chunk[..n])
            .await
            .map_err(StreamError::Write)?;
        total += n as u64;
    }

    writer.flush().await.map_err(StreamError::Write)?;
    Ok(total)
}
