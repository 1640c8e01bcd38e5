//! Per-request pipeline state.
//!
//! A [`PipelineContext`] is created when a request arrives and dropped when
//! it reaches [`Stage::Finish`]. It is never shared between requests.
//!
//! ```text
//!   Initial ──▶ Routing ──▶ PostProcess ──▶ Send ──▶ Finish
//!      │           │             │
//!      └───────────┴─────────────┘
//!        cancelled: generic error response, back to PostProcess
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::{PipelineError, ResponseData, ResponseInfo};

/// Identifies one trip through the pipeline in logs.
///
/// Uses UUID v7, so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pipeline stage. Stages are strictly ordered and never repeat, except
/// that a cancellation sends the pipeline back to [`Stage::PostProcess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Pre-processors run against the raw request.
    Initial,
    /// The endpoint's route handler produces a response.
    Routing,
    /// Post-processors rewrite the response, which is then finalized.
    PostProcess,
    /// The finalized response is written to the transport.
    Send,
    /// Terminal.
    Finish,
}

impl Stage {
    /// Returns the stage after this one. `Finish` stays `Finish`.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Initial => Self::Routing,
            Self::Routing => Self::PostProcess,
            Self::PostProcess => Self::Send,
            Self::Send | Self::Finish => Self::Finish,
        }
    }

    /// Returns the stage name used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Routing => "routing",
            Self::PostProcess => "post-process",
            Self::Send => "send",
            Self::Finish => "finish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A one-shot cancellation signal carrying the first error reported.
///
/// Clones share state. The first call to [`cancel`](Self::cancel) stores
/// its error and wakes every waiter; later calls are ignored.
///
/// # Example
///
/// ```
/// use den_core::{CancelSignal, PipelineError, ProcessError};
///
/// let signal = CancelSignal::new();
/// assert!(signal.cancel(ProcessError::new("first").into()));
/// assert!(!signal.cancel(ProcessError::new("second").into()));
/// assert_eq!(signal.error().unwrap().to_string(), "first");
/// ```
#[derive(Debug, Clone)]
pub struct CancelSignal {
    error: Arc<OnceLock<PipelineError>>,
    sender: broadcast::Sender<()>,
}

impl CancelSignal {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            error: Arc::new(OnceLock::new()),
            sender,
        }
    }

    /// Fires the signal with `error`.
    ///
    /// Returns `true` if this call fired it, `false` if it had already fired
    /// (in which case `error` is discarded).
    pub fn cancel(&self, error: PipelineError) -> bool {
        if self.error.set(error).is_ok() {
            // No receivers is fine.
            let _ = self.sender.send(());
            true
        } else {
            false
        }
    }

    /// Returns `true` once the signal has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.error.get().is_some()
    }

    /// Returns the recorded error, if the signal has fired.
    #[must_use]
    pub fn error(&self) -> Option<&PipelineError> {
        self.error.get()
    }

    /// Completes once the signal has fired. Completes immediately if it
    /// already has.
    pub async fn cancelled(&self) {
        // Subscribe before checking so a concurrent cancel is never missed.
        let mut receiver = self.sender.subscribe();
        if self.is_cancelled() {
            return;
        }
        let _ = receiver.recv().await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// The handles a stage's unit of work uses to report its outcome.
#[derive(Debug, Clone)]
pub(crate) struct StageSignals {
    advance: mpsc::Sender<Stage>,
    cancel: CancelSignal,
}

impl StageSignals {
    /// Reports success: the pipeline should move to `next`.
    pub(crate) async fn advance(&self, next: Stage) {
        // The receiver lives in the same context and outlives every unit.
        let _ = self.advance.send(next).await;
    }

    /// Reports failure. Returns `true` if this error is the one recorded.
    pub(crate) fn cancel(&self, error: PipelineError) -> bool {
        self.cancel.cancel(error)
    }

    /// Returns the context's cancellation signal.
    #[must_use]
    pub(crate) fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }
}

/// The response slots a stage reads and fills.
#[derive(Debug, Default)]
pub(crate) struct StageSlots {
    /// Set by routing (or by the error path); consumed when finalized.
    pub(crate) info: Option<ResponseInfo>,
    /// Set by post-processing; consumed by send.
    pub(crate) data: Option<ResponseData>,
}

/// State for one request's trip through the pipeline.
///
/// Only the router drives a context; its stage slots and signals are not
/// part of the public API.
///
/// ```compile_fail
/// use den_core::StageSlots;
/// ```
///
/// ```compile_fail
/// use den_core::StageSignals;
/// ```
#[derive(Debug)]
pub struct PipelineContext {
    id: RequestId,
    stage: Stage,
    slots: StageSlots,
    signals: StageSignals,
    advanced: mpsc::Receiver<Stage>,
    started_at: Instant,
}

impl PipelineContext {
    /// Creates a context in [`Stage::Initial`].
    #[must_use]
    pub fn new() -> Self {
        let (advance, advanced) = mpsc::channel(1);
        Self {
            id: RequestId::new(),
            stage: Stage::Initial,
            slots: StageSlots::default(),
            signals: StageSignals {
                advance,
                cancel: CancelSignal::new(),
            },
            advanced,
            started_at: Instant::now(),
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the current stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns when the context was created.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the response produced so far, if any.
    #[must_use]
    pub fn response(&self) -> Option<&ResponseInfo> {
        self.slots.info.as_ref()
    }

    /// Returns the finalized response, if post-processing completed.
    #[must_use]
    pub fn response_data(&self) -> Option<&ResponseData> {
        self.slots.data.as_ref()
    }

    /// Cancels the context. Only the first error is kept.
    pub fn cancel(&self, error: PipelineError) -> bool {
        self.signals.cancel(error)
    }

    /// Returns `true` once the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signals.cancel.is_cancelled()
    }

    /// Returns the error the context was cancelled with.
    #[must_use]
    pub fn error(&self) -> Option<&PipelineError> {
        self.signals.cancel.error()
    }

    /// Returns the deadline for this request.
    ///
    /// Deadlines are not enforced by the pipeline; this always returns
    /// `None`. It is the hook for a future timeout policy.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        None
    }

    /// Moves to `stage`. Moving past [`Stage::Finish`] is a no-op.
    pub(crate) fn set_stage(&mut self, stage: Stage) {
        if self.stage != Stage::Finish {
            self.stage = stage;
        }
    }

    /// Splits the context into the parts a stage unit and the driver use
    /// concurrently.
    pub(crate) fn split(
        &mut self,
    ) -> (&mut StageSlots, &StageSignals, &mut mpsc::Receiver<Stage>) {
        (&mut self.slots, &self.signals, &mut self.advanced)
    }

    /// Replaces any response with a generic error response built from the
    /// recorded error and rewinds to [`Stage::PostProcess`].
    ///
    /// Once sending has started there is nothing left to redirect, so the
    /// context finishes instead.
    pub(crate) fn redirect_to_error(&mut self) {
        if self.stage >= Stage::Send {
            self.set_stage(Stage::Finish);
            return;
        }

        let (code, message) = match self.error() {
            Some(err) => (err.status_code(), err.to_string()),
            None => (http::StatusCode::SERVICE_UNAVAILABLE, String::new()),
        };
        self.slots.info = Some(ResponseInfo::generic_error(code, message));
        self.slots.data = None;
        self.stage = Stage::PostProcess;
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProcessError, RouteError, ENDPOINT_ERROR};
    use http::StatusCode;
    use std::time::Duration;

    #[test]
    fn test_stage_order() {
        assert!(Stage::Initial < Stage::Routing);
        assert!(Stage::Routing < Stage::PostProcess);
        assert!(Stage::PostProcess < Stage::Send);
        assert!(Stage::Send < Stage::Finish);
    }

    #[test]
    fn test_stage_next() {
        assert_eq!(Stage::Initial.next(), Stage::Routing);
        assert_eq!(Stage::Routing.next(), Stage::PostProcess);
        assert_eq!(Stage::PostProcess.next(), Stage::Send);
        assert_eq!(Stage::Send.next(), Stage::Finish);
        assert_eq!(Stage::Finish.next(), Stage::Finish);
    }

    #[test]
    fn test_cancel_first_error_wins() {
        let ctx = PipelineContext::new();
        assert!(!ctx.is_cancelled());

        assert!(ctx.cancel(ProcessError::new("first").into()));
        assert!(!ctx.cancel(RouteError::no_handler("second").into()));

        assert!(ctx.is_cancelled());
        assert_eq!(ctx.error().unwrap().to_string(), "first");
    }

    #[test]
    fn test_cancel_signal_clone_shares_state() {
        let signal = CancelSignal::new();
        let clone = signal.clone();

        clone.cancel(ProcessError::new("shared").into());

        assert!(signal.is_cancelled());
        assert_eq!(signal.error().unwrap().to_string(), "shared");
    }

    #[tokio::test]
    async fn test_cancelled_completes_when_fired() {
        let signal = CancelSignal::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel(ProcessError::new("late").into());
        });

        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("cancelled should complete");
    }

    #[tokio::test]
    async fn test_cancelled_completes_immediately_if_fired() {
        let signal = CancelSignal::new();
        signal.cancel(ProcessError::new("early").into());

        tokio::time::timeout(Duration::from_millis(10), signal.cancelled())
            .await
            .expect("cancelled should complete immediately");
    }

    #[test]
    fn test_set_stage_past_finish_is_noop() {
        let mut ctx = PipelineContext::new();
        ctx.set_stage(Stage::Finish);
        ctx.set_stage(Stage::Routing);
        assert_eq!(ctx.stage(), Stage::Finish);
    }

    #[tokio::test]
    async fn test_redirect_to_error_builds_generic_response() {
        let mut ctx = PipelineContext::new();
        ctx.set_stage(Stage::Routing);
        ctx.cancel(RouteError::no_handler("missing").into());

        ctx.redirect_to_error();

        assert_eq!(ctx.stage(), Stage::PostProcess);
        assert!(ctx.response_data().is_none());
        let response = ctx.slots.info.take().unwrap();
        assert_eq!(response.code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.endpoint(), ENDPOINT_ERROR);
        let body = response.body.into_bytes().await.unwrap();
        assert_eq!(
            String::from_utf8_lossy(&body),
            "no handler registered for endpoint 'missing'"
        );
    }

    #[test]
    fn test_redirect_during_send_finishes() {
        let mut ctx = PipelineContext::new();
        ctx.set_stage(Stage::Send);
        ctx.cancel(ProcessError::new("too late").into());

        ctx.redirect_to_error();

        assert_eq!(ctx.stage(), Stage::Finish);
    }

    #[test]
    fn test_deadline_is_unset() {
        assert!(PipelineContext::new().deadline().is_none());
    }

    #[tokio::test]
    async fn test_stage_signal_handoff() {
        let mut ctx = PipelineContext::new();
        let (_, signals, advanced) = ctx.split();

        signals.advance(Stage::Routing).await;
        assert_eq!(advanced.recv().await, Some(Stage::Routing));
    }
}
