//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Ctrl+C → Shutdown::trigger
//!     → scheduled tasks stop
//!     → binder refresh stops
//!     → HTTP server drains and exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
