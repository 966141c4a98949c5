//! Outbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! caller: client.get("/users/{id}", &[42])
//!     → capture.rs (template → holder.rs, for the extent of the call)
//!     → rest.rs (expand template, build request)
//!     → pipeline.rs (interceptor chain)
//!         → interceptor.rs (time call, read template from holder, record)
//!         → ... host interceptors ...
//!     → Transport (hyper)
//! ```
//!
//! # Design Decisions
//! - The holder is the only channel between capture and the timer
//! - Clients are retrofitted at construction time through factory.rs
//!   customizers

pub mod capture;
pub mod factory;
pub mod holder;
pub mod interceptor;
pub mod pipeline;
pub mod rest;

pub use capture::capture_url_template;
pub use factory::{
    PrependInterceptorCustomizer, RestClientCustomizer, RestClientFactory,
    UrlTemplateCaptureCustomizer,
};
pub use holder::UrlTemplateHolder;
pub use interceptor::MetricsClientHttpRequestInterceptor;
pub use pipeline::{
    ClientError, ClientHttpRequestInterceptor, Execution, HyperTransport, Transport,
    TransportError,
};
pub use rest::{expand_template, RestClient};
