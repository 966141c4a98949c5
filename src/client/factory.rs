//! Client construction with customizers.
//!
//! Every client built (or passed through) the factory is handed to each
//! registered customizer in order. This is how instrumentation reaches
//! clients constructed anywhere in the application.

use std::sync::Arc;
use url::Url;

use crate::client::pipeline::{ClientHttpRequestInterceptor, HyperTransport, Transport};
use crate::client::rest::RestClient;

/// Adjusts a freshly built client.
pub trait RestClientCustomizer: Send + Sync {
    fn customize(&self, client: &mut RestClient);
}

/// Builds `RestClient`s and applies customizers to them.
#[derive(Clone)]
pub struct RestClientFactory {
    transport: Arc<dyn Transport>,
    customizers: Vec<Arc<dyn RestClientCustomizer>>,
}

impl RestClientFactory {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            customizers: Vec::new(),
        }
    }

    pub fn with_hyper() -> Self {
        Self::new(Arc::new(HyperTransport::new()))
    }

    pub fn add_customizer(&mut self, customizer: Arc<dyn RestClientCustomizer>) {
        self.customizers.push(customizer);
    }

    pub fn customizer_count(&self) -> usize {
        self.customizers.len()
    }

    /// Build a client with an empty chain.
    pub fn build(&self) -> RestClient {
        self.customize(RestClient::new(self.transport.clone()))
    }

    /// Build a client with a base URL and initial chain.
    pub fn build_with(
        &self,
        base_url: Option<Url>,
        interceptors: Vec<Arc<dyn ClientHttpRequestInterceptor>>,
    ) -> RestClient {
        let mut client = RestClient::new(self.transport.clone());
        if let Some(base) = base_url {
            client = client.with_base_url(base);
        }
        client.set_interceptors(interceptors);
        self.customize(client)
    }

    /// Apply every customizer to a client built elsewhere.
    pub fn customize(&self, mut client: RestClient) -> RestClient {
        for customizer in &self.customizers {
            customizer.customize(&mut client);
        }
        client
    }
}

/// Prepends an interceptor to every client's chain.
///
/// The existing chain is copied into a new one, never mutated in place.
pub struct PrependInterceptorCustomizer {
    interceptor: Arc<dyn ClientHttpRequestInterceptor>,
}

impl PrependInterceptorCustomizer {
    pub fn new(interceptor: Arc<dyn ClientHttpRequestInterceptor>) -> Self {
        Self { interceptor }
    }
}

impl RestClientCustomizer for PrependInterceptorCustomizer {
    fn customize(&self, client: &mut RestClient) {
        if client
            .interceptors()
            .iter()
            .any(|existing| Arc::ptr_eq(existing, &self.interceptor))
        {
            return;
        }

        let mut chain = Vec::with_capacity(client.interceptors().len() + 1);
        chain.push(self.interceptor.clone());
        chain.extend(client.interceptors().iter().cloned());
        client.set_interceptors(chain);
    }
}

/// Turns on URL template capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlTemplateCaptureCustomizer;

impl RestClientCustomizer for UrlTemplateCaptureCustomizer {
    fn customize(&self, client: &mut RestClient) {
        client.set_url_template_capture(true);
    }
}
