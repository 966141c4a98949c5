//! Client request timer.
//!
//! Sits first in the outbound chain. Every call that enters it produces one
//! observation, whatever the outcome:
//! ```text
//! Ok(response)     → status = response code
//! Err(_)           → status = IO_ERROR (error returned unchanged)
//! future dropped   → status = CANCELLED
//! ```

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, Uri};
use std::sync::Arc;
use std::time::Instant;

use crate::client::holder::UrlTemplateHolder;
use crate::client::pipeline::{ClientError, ClientHttpRequestInterceptor, Execution};
use crate::http::tags::{ClientExchange, ClientStatus, WebMetricsTagConfigurer};
use crate::observability::registry::{record_quietly, MeterRegistry};

/// Interceptor timing every outbound request.
pub struct MetricsClientHttpRequestInterceptor {
    registry: Arc<dyn MeterRegistry>,
    configurer: Arc<dyn WebMetricsTagConfigurer>,
    metric_name: String,
}

impl MetricsClientHttpRequestInterceptor {
    pub fn new(
        registry: Arc<dyn MeterRegistry>,
        configurer: Arc<dyn WebMetricsTagConfigurer>,
        metric_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            configurer,
            metric_name: metric_name.into(),
        }
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    fn record(&self, method: &Method, uri: &Uri, status: ClientStatus, start: Instant) {
        let template = UrlTemplateHolder::get();
        let tags = self.configurer.client_tags(&ClientExchange {
            method,
            uri,
            url_template: template.as_deref(),
            status,
        });
        record_quietly(self.registry.as_ref(), &self.metric_name, &tags, start.elapsed());
    }
}

#[async_trait]
impl ClientHttpRequestInterceptor for MetricsClientHttpRequestInterceptor {
    async fn intercept(
        &self,
        request: Request<Body>,
        next: Execution<'_>,
    ) -> Result<Response<Body>, ClientError> {
        let mut pending = PendingCall {
            interceptor: self,
            method: request.method().clone(),
            uri: request.uri().clone(),
            start: Instant::now(),
            recorded: false,
        };

        let result = next.execute(request).await;
        let status = match &result {
            Ok(response) => ClientStatus::Code(response.status()),
            Err(e) => {
                tracing::debug!(uri = %pending.uri, error = %e, "Outbound request failed");
                ClientStatus::IoError
            }
        };
        pending.finish(status);
        result
    }
}

/// In-flight call; records `CANCELLED` if dropped before `finish`.
struct PendingCall<'a> {
    interceptor: &'a MetricsClientHttpRequestInterceptor,
    method: Method,
    uri: Uri,
    start: Instant,
    recorded: bool,
}

impl PendingCall<'_> {
    fn finish(&mut self, status: ClientStatus) {
        if !std::mem::replace(&mut self.recorded, true) {
            self.interceptor
                .record(&self.method, &self.uri, status, self.start);
        }
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        self.finish(ClientStatus::Cancelled);
    }
}
