//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Instrumentation (web, client, scheduling):
//!     → tags.rs (format values, build ordered tag sets)
//!     → registry.rs (MeterRegistry::record)
//!     → global `metrics` recorder (installed by exporter.rs or the host)
//!
//! Binders:
//!     → binders.rs (process + runtime gauges)
//!     → logging.rs (log event counters, subscriber init)
//! ```
//!
//! # Design Decisions
//! - Registry failures are logged, never propagated into requests
//! - Every timing goes through the `MeterRegistry` seam so tests can
//!   observe it without a global recorder

pub mod binders;
pub mod exporter;
pub mod logging;
pub mod registry;
pub mod tags;

pub use registry::{MeterRegistry, MetricsRegistry, Observation, SimpleMeterRegistry};
pub use tags::{IdentityTagFormatter, PathNormalizingFormatter, Tag, TagFormatter, TagSet};
