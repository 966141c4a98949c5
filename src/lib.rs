//! Request timing metrics for Axum servers, outbound HTTP clients and
//! scheduled tasks.

pub mod autoconfig;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod scheduling;

pub use autoconfig::{ApplicationType, Installation, MetricsAutoConfiguration};
pub use config::MetricsConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
