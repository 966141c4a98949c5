//! Collaborators shared by both server timer variants.

use axum::extract::MatchedPath;
use axum::http::{Method, Request};
use std::sync::Arc;
use std::time::Duration;

use crate::http::tags::{ServerExchange, ServerStatus, WebMetricsTagConfigurer};
use crate::observability::registry::{record_quietly, MeterRegistry};

/// Registry, configurer and meter name for inbound request timings.
#[derive(Clone)]
pub struct ServerMetricsContext {
    registry: Arc<dyn MeterRegistry>,
    configurer: Arc<dyn WebMetricsTagConfigurer>,
    metric_name: Arc<str>,
}

impl ServerMetricsContext {
    pub fn new(
        registry: Arc<dyn MeterRegistry>,
        configurer: Arc<dyn WebMetricsTagConfigurer>,
        metric_name: impl Into<Arc<str>>,
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

    /// Build tags for a finished request and record its timing.
    pub fn record(
        &self,
        method: &Method,
        route: Option<&str>,
        status: ServerStatus,
        exception: Option<&str>,
        elapsed: Duration,
    ) {
        let tags = self.configurer.server_tags(&ServerExchange {
            method,
            route,
            status,
            exception,
        });
        record_quietly(self.registry.as_ref(), &self.metric_name, &tags, elapsed);
    }
}

/// Route template matched by the router, if any.
pub(crate) fn matched_route<B>(request: &Request<B>) -> Option<String> {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
}
