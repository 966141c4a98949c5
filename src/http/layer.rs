//! Tower-layer request timer.
//!
//! The start instant is taken when `call` is entered and travels inside the
//! response future, then inside the response body, so completion may happen
//! on any worker thread.
//!
//! # Outcomes
//! ```text
//! Ok(response), body ends     → status = response code (or ErrorInfo classification)
//! Ok(response), body errors   → status = SERVER_ERROR, exception = type name of the body error
//! Ok(response), body dropped  → status = CANCELLED
//! Err(e)                      → status = SERVER_ERROR, exception = type name of e
//! panic                       → status = SERVER_ERROR, exception = Panic (then resumes)
//! future dropped              → status = CANCELLED
//! ```

use axum::http::{Method, Request, Response};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hyper::body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

use crate::http::context::{matched_route, ServerMetricsContext};
use crate::http::error::ErrorInfo;
use crate::http::tags::{simple_type_name, ServerStatus};

/// Layer producing [`ServerTiming`] services.
#[derive(Clone)]
pub struct ServerTimingLayer {
    context: ServerMetricsContext,
}

impl ServerTimingLayer {
    pub fn new(context: ServerMetricsContext) -> Self {
        Self { context }
    }
}

impl<S> Layer<S> for ServerTimingLayer {
    type Service = ServerTiming<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ServerTiming {
            inner,
            context: self.context.clone(),
        }
    }
}

/// Service timing every request through `inner`.
#[derive(Clone)]
pub struct ServerTiming<S> {
    inner: S,
    context: ServerMetricsContext,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ServerTiming<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Body + Send + 'static,
    ResBody::Error: 'static,
{
    type Response = Response<TimedBody<ResBody>>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let mut observation = PendingObservation {
            context: self.context.clone(),
            method: request.method().clone(),
            route: matched_route(&request),
            start: Instant::now(),
            status: ServerStatus::Cancelled,
            exception: None,
            recorded: false,
        };
        let response = self.inner.call(request);

        Box::pin(async move {
            match AssertUnwindSafe(response).catch_unwind().await {
                Ok(Ok(response)) => {
                    match response.extensions().get::<ErrorInfo>() {
                        Some(info) => {
                            observation.status = info.classify();
                            observation.exception = Some(info.exception.clone());
                        }
                        None => observation.status = ServerStatus::Code(response.status()),
                    }
                    Ok(response.map(|body| TimedBody::new(body, observation)))
                }
                Ok(Err(error)) => {
                    observation.record(ServerStatus::ServerError, Some(simple_type_name::<S::Error>()));
                    Err(error)
                }
                Err(panic) => {
                    observation.record(ServerStatus::ServerError, Some("Panic"));
                    std::panic::resume_unwind(panic)
                }
            }
        })
    }
}

pin_project! {
    /// Response body that records the request once the body terminates.
    pub struct TimedBody<B> {
        #[pin]
        inner: B,
        observation: Option<PendingObservation>,
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for TimedBody<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedBody")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<B: Body> TimedBody<B> {
    fn new(inner: B, mut observation: PendingObservation) -> Self {
        if inner.is_end_stream() {
            observation.complete();
            return Self {
                inner,
                observation: None,
            };
        }
        Self {
            inner,
            observation: Some(observation),
        }
    }
}

impl<B> Body for TimedBody<B>
where
    B: Body,
    B::Error: 'static,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let frame = ready!(this.inner.as_mut().poll_frame(cx));

        match &frame {
            Some(Ok(_)) => {
                if this.inner.is_end_stream() {
                    if let Some(mut observation) = this.observation.take() {
                        observation.complete();
                    }
                }
            }
            Some(Err(_)) => {
                if let Some(mut observation) = this.observation.take() {
                    observation.record(ServerStatus::ServerError, Some(simple_type_name::<B::Error>()));
                }
            }
            None => {
                if let Some(mut observation) = this.observation.take() {
                    observation.complete();
                }
            }
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Start of an in-flight request; records `CANCELLED` if dropped unrecorded.
///
/// `status` and `exception` hold the outcome seen in the response head,
/// used once the body completes.
struct PendingObservation {
    context: ServerMetricsContext,
    method: Method,
    route: Option<String>,
    start: Instant,
    status: ServerStatus,
    exception: Option<String>,
    recorded: bool,
}

impl PendingObservation {
    fn complete(&mut self) {
        let exception = self.exception.take();
        self.record(self.status, exception.as_deref());
    }

    fn record(&mut self, status: ServerStatus, exception: Option<&str>) {
        if std::mem::replace(&mut self.recorded, true) {
            return;
        }
        self.context.record(
            &self.method,
            self.route.as_deref(),
            status,
            exception,
            self.start.elapsed(),
        );
    }
}

impl Drop for PendingObservation {
    fn drop(&mut self) {
        if !self.recorded {
            tracing::debug!(method = %self.method, route = ?self.route, "Request cancelled before completion");
            self.record(ServerStatus::Cancelled, None);
        }
    }
}
