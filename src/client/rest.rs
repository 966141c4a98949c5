//! Template-based HTTP client.
//!
//! # Responsibilities
//! - Expand URL templates (`/users/{id}`) with positional variables
//! - Resolve relative templates against an optional base URL
//! - Run requests through the interceptor chain
//!
//! # Design Decisions
//! - Entry points that take a template first (`get`, `post`, `exchange`, ...)
//!   go through URL template capture when it is enabled; `execute` does not
//! - The interceptor chain is shared and immutable; `set_interceptors`
//!   installs a new one

use axum::body::Body;
use axum::http::{Method, Request, Response, Uri};
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::client::capture::capture_url_template;
use crate::client::pipeline::{
    ClientError, ClientHttpRequestInterceptor, Execution, HyperTransport, Transport,
};

/// Maximum body size read by `get_for_string`.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// HTTP client with an interceptor chain and template entry points.
#[derive(Clone)]
pub struct RestClient {
    base_url: Option<Url>,
    interceptors: Arc<[Arc<dyn ClientHttpRequestInterceptor>]>,
    transport: Arc<dyn Transport>,
    capture_templates: bool,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("interceptors", &self.interceptors.len())
            .field("capture_templates", &self.capture_templates)
            .finish()
    }
}

impl RestClient {
    /// Client over the given transport, with an empty chain.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: None,
            interceptors: Arc::from(Vec::new()),
            transport,
            capture_templates: false,
        }
    }

    /// Client over a fresh hyper transport.
    pub fn with_hyper() -> Self {
        Self::new(Arc::new(HyperTransport::new()))
    }

    /// Resolve relative templates against `base_url`.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Current chain, outermost first.
    pub fn interceptors(&self) -> &[Arc<dyn ClientHttpRequestInterceptor>] {
        &self.interceptors
    }

    /// Replace the chain.
    pub fn set_interceptors(&mut self, interceptors: Vec<Arc<dyn ClientHttpRequestInterceptor>>) {
        self.interceptors = Arc::from(interceptors);
    }

    /// Enable or disable URL template capture for template entry points.
    pub fn set_url_template_capture(&mut self, enabled: bool) {
        self.capture_templates = enabled;
    }

    pub fn url_template_capture(&self) -> bool {
        self.capture_templates
    }

    /// GET `url_template` expanded with `vars`.
    pub async fn get<V>(&self, url_template: &str, vars: &[V]) -> Result<Response<Body>, ClientError>
    where
        V: fmt::Display + Sync,
    {
        self.exchange(url_template, Method::GET, vars, Body::empty())
            .await
    }

    /// GET and read the body as text. Non-2xx responses are errors.
    pub async fn get_for_string<V>(&self, url_template: &str, vars: &[V]) -> Result<String, ClientError>
    where
        V: fmt::Display + Sync,
    {
        let response = self.get(url_template, vars).await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let bytes = axum::body::to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| ClientError::Body(e.to_string()))?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ClientError::Body(e.to_string()))
    }

    /// POST `body` to `url_template` expanded with `vars`.
    pub async fn post<V>(
        &self,
        url_template: &str,
        vars: &[V],
        body: impl Into<Body>,
    ) -> Result<Response<Body>, ClientError>
    where
        V: fmt::Display + Sync,
    {
        self.exchange(url_template, Method::POST, vars, body.into())
            .await
    }

    /// PUT `body` to `url_template` expanded with `vars`.
    pub async fn put<V>(
        &self,
        url_template: &str,
        vars: &[V],
        body: impl Into<Body>,
    ) -> Result<Response<Body>, ClientError>
    where
        V: fmt::Display + Sync,
    {
        self.exchange(url_template, Method::PUT, vars, body.into())
            .await
    }

    /// DELETE `url_template` expanded with `vars`.
    pub async fn delete<V>(&self, url_template: &str, vars: &[V]) -> Result<Response<Body>, ClientError>
    where
        V: fmt::Display + Sync,
    {
        self.exchange(url_template, Method::DELETE, vars, Body::empty())
            .await
    }

    /// Send `method` to `url_template` expanded with `vars`.
    pub async fn exchange<V>(
        &self,
        url_template: &str,
        method: Method,
        vars: &[V],
        body: Body,
    ) -> Result<Response<Body>, ClientError>
    where
        V: fmt::Display + Sync,
    {
        let call = async {
            let uri = self.resolve(url_template, vars)?;
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(body)
                .map_err(|e| ClientError::InvalidUrl {
                    url: url_template.to_string(),
                    reason: e.to_string(),
                })?;
            self.execute(request).await
        };

        if self.capture_templates {
            capture_url_template(url_template, call).await
        } else {
            call.await
        }
    }

    /// Send a prebuilt request through the chain. No template is captured.
    pub async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, ClientError> {
        tracing::debug!(method = %request.method(), uri = %request.uri(), "Outbound request");
        Execution::new(&self.interceptors, self.transport.as_ref())
            .execute(request)
            .await
    }

    fn resolve<V: fmt::Display>(&self, url_template: &str, vars: &[V]) -> Result<Uri, ClientError> {
        let expanded = expand_template(url_template, vars)?;
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: expanded.clone(),
            reason,
        };

        let url = match &self.base_url {
            Some(base) => base.join(&expanded).map_err(|e| invalid(e.to_string()))?,
            None => Url::parse(&expanded).map_err(|e| invalid(e.to_string()))?,
        };
        url.as_str().parse::<Uri>().map_err(|e| invalid(e.to_string()))
    }
}

/// Substitute `{name}` placeholders, in order, with percent-encoded `vars`.
pub fn expand_template<V: fmt::Display>(template: &str, vars: &[V]) -> Result<String, ClientError> {
    let mut out = String::with_capacity(template.len());
    let mut vars = vars.iter();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let close = rest[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| ClientError::InvalidUrl {
                url: template.to_string(),
                reason: "unterminated '{' in template".to_string(),
            })?;

        let value = vars.next().ok_or_else(|| ClientError::InvalidUrl {
            url: template.to_string(),
            reason: format!("no value for variable '{}'", &rest[open + 1..close]),
        })?;

        out.push_str(&rest[..open]);
        encode_into(&mut out, &value.to_string());
        rest = &rest[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn encode_into(out: &mut String, value: &str) {
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template() {
        assert_eq!(expand_template("/users/{id}", &[42]).unwrap(), "/users/42");
        assert_eq!(
            expand_template("/users/{id}/orders/{order}", &["7", "a b"]).unwrap(),
            "/users/7/orders/a%20b"
        );
        assert_eq!(expand_template::<u32>("/health", &[]).unwrap(), "/health");
    }

    #[test]
    fn test_expand_template_errors() {
        assert!(matches!(
            expand_template::<u32>("/users/{id}", &[]),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            expand_template("/users/{id", &[1]),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_resolve_against_base() {
        let client = RestClient::with_hyper()
            .with_base_url(Url::parse("http://api.example.com/").unwrap());
        let uri = client.resolve("/users/{id}", &[42]).unwrap();
        assert_eq!(uri.host(), Some("api.example.com"));
        assert_eq!(uri.path(), "/users/42");
    }

    #[test]
    fn test_relative_without_base_fails() {
        let client = RestClient::with_hyper();
        assert!(matches!(
            client.resolve("/users/{id}", &[42]),
            Err(ClientError::InvalidUrl { .. })
        ));
    }
}
