//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MetricsConfig (validated, immutable)
//!     → read once by autoconfig at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; meter names are resolved once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config};
pub use schema::MetricsConfig;
pub use schema::{BindersConfig, InterceptionConfig, ListenerConfig, ObservabilityConfig};
