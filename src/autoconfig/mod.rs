//! Metrics wiring.
//!
//! # Responsibilities
//! - Resolve collaborators once: registry, tag formatter, tag configurer
//! - Install timers into the host's pipelines on request
//! - Yield to collaborators the host has already supplied
//!
//! # Installation Matrix
//! ```text
//! install_server_timer        → Servlet: interceptor middleware
//!                               Reactive: tower layer
//! install_client_timer        → prepend interceptor to every factory client
//! install_url_template_capture→ only when interception.enabled
//! install_scheduled_timer     → only when interception.enabled
//! install_process_binder      → only when binders.process and supported
//! install_logging_binder      → only when binders.logging
//! ```

use axum::Router;
use std::sync::Arc;

use crate::client::factory::{
    PrependInterceptorCustomizer, RestClientFactory, UrlTemplateCaptureCustomizer,
};
use crate::client::interceptor::MetricsClientHttpRequestInterceptor;
use crate::client::pipeline::ClientHttpRequestInterceptor;
use crate::config::MetricsConfig;
use crate::error::InstallError;
use crate::http::context::ServerMetricsContext;
use crate::http::interceptor::{intercept, MetricsHandlerInterceptor, SharedInterceptor};
use crate::http::layer::ServerTimingLayer;
use crate::http::tags::{
    DefaultWebMetricsTagConfigurer, EmptyWebMetricsTagConfigurer, WebMetricsTagConfigurer,
};
use crate::observability::binders::ProcessMetrics;
use crate::observability::logging::LogEventMetricsLayer;
use crate::observability::registry::MeterRegistry;
use crate::observability::tags::{IdentityTagFormatter, PathNormalizingFormatter, TagFormatter};
use crate::scheduling::{Scheduler, SchedulingTimer};

/// Kind of server pipeline the application runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationType {
    /// Handler-interceptor pipeline (axum middleware).
    Servlet,
    /// Service pipeline (tower layer).
    Reactive,
}

/// Outcome of an install operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    Installed,
    /// The host already provided this collaborator; ours was not installed.
    Yielded,
}

/// Builder collecting host-supplied collaborators.
pub struct MetricsAutoConfigurationBuilder {
    config: MetricsConfig,
    registry: Option<Arc<dyn MeterRegistry>>,
    tag_formatter: Option<Arc<dyn TagFormatter>>,
    tag_configurer: Option<Arc<dyn WebMetricsTagConfigurer>>,
    handler_interceptor: Option<SharedInterceptor>,
    client_interceptor: Option<Arc<dyn ClientHttpRequestInterceptor>>,
}

impl MetricsAutoConfigurationBuilder {
    pub fn registry(mut self, registry: Arc<dyn MeterRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the default tag formatter.
    pub fn tag_formatter(mut self, formatter: Arc<dyn TagFormatter>) -> Self {
        self.tag_formatter = Some(formatter);
        self
    }

    /// Replace the default tag configurer.
    pub fn tag_configurer(mut self, configurer: Arc<dyn WebMetricsTagConfigurer>) -> Self {
        self.tag_configurer = Some(configurer);
        self
    }

    /// Replace the server-side handler interceptor.
    pub fn handler_interceptor(mut self, interceptor: SharedInterceptor) -> Self {
        self.handler_interceptor = Some(interceptor);
        self
    }

    /// Replace the client-side timing interceptor.
    pub fn client_interceptor(mut self, interceptor: Arc<dyn ClientHttpRequestInterceptor>) -> Self {
        self.client_interceptor = Some(interceptor);
        self
    }

    /// Resolve every collaborator. Fails without a registry.
    pub fn build(self) -> Result<MetricsAutoConfiguration, InstallError> {
        let registry = self.registry.ok_or(InstallError::MissingRegistry)?;
        let config = self.config;

        let tag_formatter = self.tag_formatter.unwrap_or_else(|| {
            if config.tags.normalize_ids {
                Arc::new(PathNormalizingFormatter)
            } else {
                Arc::new(IdentityTagFormatter)
            }
        });

        let tag_configurer = self.tag_configurer.unwrap_or_else(|| {
            if config.tags.request_introspection {
                Arc::new(DefaultWebMetricsTagConfigurer::new(tag_formatter.clone()))
            } else {
                Arc::new(EmptyWebMetricsTagConfigurer::new(tag_formatter.clone()))
            }
        });

        let server_context = ServerMetricsContext::new(
            registry.clone(),
            tag_configurer.clone(),
            config.web.server_requests.name.as_str(),
        );

        let handler_interceptor = self.handler_interceptor.unwrap_or_else(|| {
            Arc::new(MetricsHandlerInterceptor::new(server_context.clone()))
        });

        let client_interceptor = self.client_interceptor.unwrap_or_else(|| {
            Arc::new(MetricsClientHttpRequestInterceptor::new(
                registry.clone(),
                tag_configurer.clone(),
                config.web.client_requests.name.clone(),
            ))
        });

        tracing::info!(
            server_requests = %config.web.server_requests.name,
            client_requests = %config.web.client_requests.name,
            interception = config.interception.enabled,
            "Metrics wiring resolved"
        );

        Ok(MetricsAutoConfiguration {
            config,
            registry,
            tag_formatter,
            tag_configurer,
            server_context,
            handler_interceptor,
            client_interceptor,
        })
    }
}

/// Resolved collaborators and install operations.
pub struct MetricsAutoConfiguration {
    config: MetricsConfig,
    registry: Arc<dyn MeterRegistry>,
    tag_formatter: Arc<dyn TagFormatter>,
    tag_configurer: Arc<dyn WebMetricsTagConfigurer>,
    server_context: ServerMetricsContext,
    handler_interceptor: SharedInterceptor,
    client_interceptor: Arc<dyn ClientHttpRequestInterceptor>,
}

impl MetricsAutoConfiguration {
    pub fn builder(config: MetricsConfig) -> MetricsAutoConfigurationBuilder {
        MetricsAutoConfigurationBuilder {
            config,
            registry: None,
            tag_formatter: None,
            tag_configurer: None,
            handler_interceptor: None,
            client_interceptor: None,
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn MeterRegistry> {
        &self.registry
    }

    pub fn tag_formatter(&self) -> &Arc<dyn TagFormatter> {
        &self.tag_formatter
    }

    pub fn tag_configurer(&self) -> &Arc<dyn WebMetricsTagConfigurer> {
        &self.tag_configurer
    }

    pub fn server_context(&self) -> &ServerMetricsContext {
        &self.server_context
    }

    pub fn client_interceptor(&self) -> &Arc<dyn ClientHttpRequestInterceptor> {
        &self.client_interceptor
    }

    /// Wrap every route of `router` with the handler interceptor.
    pub fn install_server_interceptor<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn_with_state(
            self.handler_interceptor.clone(),
            intercept,
        ))
    }

    /// Tower layer timing a service pipeline.
    pub fn install_server_layer(&self) -> ServerTimingLayer {
        ServerTimingLayer::new(self.server_context.clone())
    }

    /// Install the server timer variant matching `application_type`.
    pub fn install_server_timer<S>(&self, application_type: ApplicationType, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        tracing::debug!(?application_type, "Installing server request timer");
        match application_type {
            ApplicationType::Servlet => self.install_server_interceptor(router),
            ApplicationType::Reactive => router.layer(self.install_server_layer()),
        }
    }

    /// Make every client built by `factory` time its requests.
    pub fn install_client_timer(&self, factory: &mut RestClientFactory) -> Installation {
        factory.add_customizer(Arc::new(PrependInterceptorCustomizer::new(
            self.client_interceptor.clone(),
        )));
        Installation::Installed
    }

    /// Enable URL template capture on every client built by `factory`.
    ///
    /// Without it, client observations still happen but their `uri` tag is
    /// always `none`.
    pub fn install_url_template_capture(
        &self,
        factory: &mut RestClientFactory,
    ) -> Result<Installation, InstallError> {
        if !self.config.interception.enabled {
            return Err(InstallError::Disabled("url template capture"));
        }
        factory.add_customizer(Arc::new(UrlTemplateCaptureCustomizer));
        Ok(Installation::Installed)
    }

    /// Time every task `scheduler` dispatches.
    pub fn install_scheduled_timer(&self, scheduler: &mut Scheduler) -> Result<Installation, InstallError> {
        if !self.config.interception.enabled {
            return Err(InstallError::Disabled("scheduled task timer"));
        }
        if scheduler.timer().is_some() {
            return Ok(Installation::Yielded);
        }
        scheduler.set_timer(Arc::new(SchedulingTimer::new(
            self.registry.clone(),
            self.config.scheduling.name.clone(),
        )));
        Ok(Installation::Installed)
    }

    /// Publish process gauges once and hand back the binder for refreshes.
    pub fn install_process_binder(&self) -> Result<ProcessMetrics, InstallError> {
        if !self.config.binders.process {
            return Err(InstallError::Disabled("process binder"));
        }
        let binder = ProcessMetrics::new();
        binder.bind()?;
        Ok(binder)
    }

    /// Layer counting log events, for inclusion in the host's subscriber.
    pub fn install_logging_binder(&self) -> Option<LogEventMetricsLayer> {
        self.config.binders.logging.then_some(LogEventMetricsLayer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tags::{ServerExchange, ServerStatus};
    use crate::lifecycle::Shutdown;
    use axum::http::{Method, StatusCode};
    use crate::observability::SimpleMeterRegistry;

    fn config() -> MetricsConfig {
        MetricsConfig::default()
    }

    #[test]
    fn test_requires_registry() {
        let result = MetricsAutoConfiguration::builder(config()).build();
        assert!(matches!(result, Err(InstallError::MissingRegistry)));
    }

    #[test]
    fn test_yields_to_host_formatter() {
        struct Upper;
        impl TagFormatter for Upper {
            fn format(&self, input: &str) -> String {
                input.to_uppercase()
            }
        }

        let formatter: Arc<dyn TagFormatter> = Arc::new(Upper);
        let metrics = MetricsAutoConfiguration::builder(config())
            .registry(Arc::new(SimpleMeterRegistry::new()))
            .tag_formatter(formatter.clone())
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(metrics.tag_formatter(), &formatter));
    }

    #[test]
    fn test_normalize_ids_selects_formatter() {
        let mut config = config();
        config.tags.normalize_ids = true;
        let metrics = MetricsAutoConfiguration::builder(config)
            .registry(Arc::new(SimpleMeterRegistry::new()))
            .build()
            .unwrap();
        assert_eq!(metrics.tag_formatter().format("/users/42"), "/users/{id}");
    }

    #[test]
    fn test_request_introspection_off_selects_empty_configurer() {
        let mut config = config();
        config.tags.request_introspection = false;
        let metrics = MetricsAutoConfiguration::builder(config)
            .registry(Arc::new(SimpleMeterRegistry::new()))
            .build()
            .unwrap();

        let tags = metrics.tag_configurer().server_tags(&ServerExchange {
            method: &Method::GET,
            route: Some("/users/{id}"),
            status: ServerStatus::Code(StatusCode::OK),
            exception: None,
        });
        assert_eq!(tags.get("uri"), Some("UNKNOWN"));
        assert_eq!(tags.get("status"), Some("200"));
    }

    #[tokio::test]
    async fn test_interception_disabled() {
        let mut config = config();
        config.interception.enabled = false;
        let metrics = MetricsAutoConfiguration::builder(config)
            .registry(Arc::new(SimpleMeterRegistry::new()))
            .build()
            .unwrap();

        let mut factory = RestClientFactory::with_hyper();
        assert_eq!(metrics.install_client_timer(&mut factory), Installation::Installed);
        assert!(matches!(
            metrics.install_url_template_capture(&mut factory),
            Err(InstallError::Disabled(_))
        ));
        let client = factory.build();
        assert!(!client.url_template_capture());
        assert_eq!(client.interceptors().len(), 1);

        let mut scheduler = Scheduler::new(Shutdown::new());
        assert!(metrics.install_scheduled_timer(&mut scheduler).is_err());
        assert!(scheduler.timer().is_none());
    }

    #[tokio::test]
    async fn test_scheduled_timer_yields() {
        let registry = Arc::new(SimpleMeterRegistry::new());
        let metrics = MetricsAutoConfiguration::builder(config())
            .registry(registry.clone())
            .build()
            .unwrap();

        let mut scheduler = Scheduler::new(Shutdown::new());
        assert_eq!(
            metrics.install_scheduled_timer(&mut scheduler).unwrap(),
            Installation::Installed
        );
        assert_eq!(
            metrics.install_scheduled_timer(&mut scheduler).unwrap(),
            Installation::Yielded
        );
    }

    #[test]
    fn test_logging_binder_follows_config() {
        let mut config = config();
        config.binders.logging = false;
        let metrics = MetricsAutoConfiguration::builder(config)
            .registry(Arc::new(SimpleMeterRegistry::new()))
            .build()
            .unwrap();
        assert!(metrics.install_logging_binder().is_none());
    }
}
