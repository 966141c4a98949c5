//! Outbound request pipeline.
//!
//! # Data Flow
//! ```text
//! RestClient::execute(request)
//!     → interceptor[0].intercept(request, next)
//!         → interceptor[1].intercept(request, next)
//!             → ...
//!                 → Transport::send(request)
//! ```
//!
//! # Design Decisions
//! - The chain is an immutable slice; changing it means building a new one
//! - The terminal transport is a trait so tests can stand in for the network

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;

/// Failure below the interceptor chain.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),
}

/// Failure of an outbound call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("unexpected status {0}")]
    Status(axum::http::StatusCode),

    #[error("request rejected by interceptor: {0}")]
    Rejected(String),
}

/// Sends a fully built request over the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError>;
}

/// Transport backed by the hyper legacy client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    timeout: Option<Duration>,
}

impl HyperTransport {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            timeout: None,
        }
    }

    /// Fail requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let pending = self.client.request(request);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => pending.await?,
        };

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// One link of the outbound chain.
#[async_trait]
pub trait ClientHttpRequestInterceptor: Send + Sync {
    /// Handle `request`, normally by delegating to `next.execute`.
    async fn intercept(
        &self,
        request: Request<Body>,
        next: Execution<'_>,
    ) -> Result<Response<Body>, ClientError>;
}

/// The remainder of the chain after the current interceptor.
pub struct Execution<'a> {
    interceptors: &'a [Arc<dyn ClientHttpRequestInterceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Execution<'a> {
    pub(crate) fn new(
        interceptors: &'a [Arc<dyn ClientHttpRequestInterceptor>],
        transport: &'a dyn Transport,
    ) -> Self {
        Self {
            interceptors,
            transport,
        }
    }

    /// Pass `request` to the next interceptor, or to the transport.
    pub async fn execute(self, request: Request<Body>) -> Result<Response<Body>, ClientError> {
        match self.interceptors.split_first() {
            Some((first, rest)) => {
                first
                    .intercept(request, Execution::new(rest, self.transport))
                    .await
            }
            None => Ok(self.transport.send(request).await?),
        }
    }
}
