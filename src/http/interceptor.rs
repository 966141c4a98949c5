//! Handler-interceptor request timer.
//!
//! # State Machine
//! ```text
//! NEW ──pre_handle──▶ STARTED ──after_completion (terminal)──▶ RECORDED
//!                       │  ▲   └──after_cancellation (dropped)──▶ RECORDED
//!                       └──┘ re-dispatch / async continuation keeps the start
//! ```
//!
//! # Design Decisions
//! - Timing state rides the request extensions as `Arc<TimingState>`; a
//!   continuation that carries the same extension shares the start instant
//! - A response marked `AsyncStarted` is not terminal; the later dispatch
//!   records
//! - STARTED → RECORDED is a compare-exchange, so concurrent completions
//!   record once
//! - The middleware holds an `InFlight` guard; a dispatch dropped before the
//!   handler returns (client disconnect, outer timeout) records `CANCELLED`

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::http::context::{matched_route, ServerMetricsContext};
use crate::http::error::ErrorInfo;
use crate::http::tags::ServerStatus;

/// Phase of a request's timing.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingPhase {
    New = 0,
    Started = 1,
    Recorded = 2,
}

impl From<u8> for TimingPhase {
    fn from(val: u8) -> Self {
        match val {
            1 => TimingPhase::Started,
            2 => TimingPhase::Recorded,
            _ => TimingPhase::New,
        }
    }
}

/// Per-request timing state, stored in request extensions.
#[derive(Debug)]
pub struct TimingState {
    phase: AtomicU8,
    start: OnceLock<Instant>,
}

impl TimingState {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(TimingPhase::New as u8),
            start: OnceLock::new(),
        }
    }

    pub fn phase(&self) -> TimingPhase {
        TimingPhase::from(self.phase.load(Ordering::Acquire))
    }

    /// NEW → STARTED. Returns false if already started.
    fn start(&self) -> bool {
        let started = self
            .phase
            .compare_exchange(
                TimingPhase::New as u8,
                TimingPhase::Started as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if started {
            let _ = self.start.set(Instant::now());
        }
        started
    }

    /// STARTED → RECORDED. Returns the elapsed time for the single winner.
    fn finish(&self) -> Option<Duration> {
        self.phase
            .compare_exchange(
                TimingPhase::Started as u8,
                TimingPhase::Recorded as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()?;
        self.start.get().map(|start| start.elapsed())
    }
}

impl Default for TimingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Response marker: the handler continues asynchronously and a later
/// dispatch of the same request will complete it.
#[derive(Debug, Clone, Copy)]
pub struct AsyncStarted;

/// What an interceptor keeps about a request once it has been handed on.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub route: Option<String>,
    timing: Option<Arc<TimingState>>,
}

impl RequestHead {
    pub fn capture<B>(request: &axum::http::Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            route: matched_route(request),
            timing: request.extensions().get::<Arc<TimingState>>().cloned(),
        }
    }

    pub fn timing(&self) -> Option<&Arc<TimingState>> {
        self.timing.as_ref()
    }
}

/// Hooks around handler execution.
pub trait HandlerInterceptor: Send + Sync {
    /// Called on every dispatch before the handler runs.
    fn pre_handle(&self, request: &mut axum::http::Request<Body>);

    /// Called after every dispatch. `response` is `None` when the handler
    /// panicked.
    fn after_completion(
        &self,
        request: &RequestHead,
        response: Option<&Response>,
        error: Option<&ErrorInfo>,
    );

    /// Called when the request is dropped before the handler completed
    /// (client disconnect, outer timeout, shutdown).
    fn after_cancellation(&self, _request: &RequestHead) {}
}

/// Interceptor that times each request end to end.
pub struct MetricsHandlerInterceptor {
    context: ServerMetricsContext,
}

impl MetricsHandlerInterceptor {
    pub fn new(context: ServerMetricsContext) -> Self {
        Self { context }
    }
}

impl HandlerInterceptor for MetricsHandlerInterceptor {
    fn pre_handle(&self, request: &mut axum::http::Request<Body>) {
        let state = request
            .extensions()
            .get::<Arc<TimingState>>()
            .cloned()
            .unwrap_or_else(|| {
                let state = Arc::new(TimingState::new());
                request.extensions_mut().insert(state.clone());
                state
            });

        if !state.start() {
            tracing::trace!(phase = ?state.phase(), "Re-dispatch of timed request");
        }
    }

    fn after_completion(
        &self,
        request: &RequestHead,
        response: Option<&Response>,
        error: Option<&ErrorInfo>,
    ) {
        if response.is_some_and(|r| r.extensions().get::<AsyncStarted>().is_some()) {
            return;
        }

        let Some(elapsed) = request.timing().and_then(|t| t.finish()) else {
            return;
        };

        let status = match (error, response) {
            (Some(info), _) => info.classify(),
            (None, Some(response)) => ServerStatus::Code(response.status()),
            (None, None) => ServerStatus::ServerError,
        };

        self.context.record(
            &request.method,
            request.route.as_deref(),
            status,
            error.map(|e| e.exception.as_str()),
            elapsed,
        );
    }

    fn after_cancellation(&self, request: &RequestHead) {
        let Some(elapsed) = request.timing().and_then(|t| t.finish()) else {
            return;
        };

        tracing::debug!(method = %request.method, route = ?request.route, "Request dropped before completion");
        self.context.record(
            &request.method,
            request.route.as_deref(),
            ServerStatus::Cancelled,
            None,
            elapsed,
        );
    }
}

/// Shared handle installed as middleware state.
pub type SharedInterceptor = Arc<dyn HandlerInterceptor>;

/// Axum middleware driving a `HandlerInterceptor`.
///
/// Install with `axum::middleware::from_fn_with_state(interceptor, intercept)`
/// through `Router::layer`, so the matched route is visible.
pub async fn intercept(
    State(interceptor): State<SharedInterceptor>,
    mut request: Request,
    next: Next,
) -> Response {
    interceptor.pre_handle(&mut request);
    let mut in_flight = InFlight {
        head: RequestHead::capture(&request),
        interceptor,
        completed: false,
    };

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => {
            let error = response.extensions().get::<ErrorInfo>().cloned();
            in_flight.complete(Some(&response), error.as_ref());
            response
        }
        Err(panic) => {
            in_flight.complete(None, Some(&ErrorInfo::panic()));
            std::panic::resume_unwind(panic)
        }
    }
}

/// Dispatch in progress; reports cancellation if dropped before completing.
struct InFlight {
    interceptor: SharedInterceptor,
    head: RequestHead,
    completed: bool,
}

impl InFlight {
    fn complete(&mut self, response: Option<&Response>, error: Option<&ErrorInfo>) {
        self.completed = true;
        self.interceptor.after_completion(&self.head, response, error);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.completed {
            self.interceptor.after_cancellation(&self.head);
        }
    }
}
