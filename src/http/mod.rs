//! Inbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, timeout, tracing)
//!     → interceptor.rs | layer.rs (start timer, capture matched route)
//!     → handler
//!         → error.rs (HandlerError → response + ErrorInfo)
//!     → context.rs (build tags via tags.rs, record)
//! ```
//!
//! # Design Decisions
//! - The `uri` tag is the router's matched template, never the raw path
//! - Two timer variants share one recording path (`ServerMetricsContext`)

pub mod context;
pub mod error;
pub mod interceptor;
pub mod layer;
pub mod server;
pub mod tags;

pub use context::ServerMetricsContext;
pub use error::{ErrorInfo, HandlerError};
pub use interceptor::{
    intercept, AsyncStarted, HandlerInterceptor, MetricsHandlerInterceptor, SharedInterceptor,
    TimingState,
};
pub use layer::{ServerTiming, ServerTimingLayer};
pub use server::{AppState, HttpServer};
pub use tags::{
    DefaultWebMetricsTagConfigurer, EmptyWebMetricsTagConfigurer, WebMetricsTagConfigurer,
};
