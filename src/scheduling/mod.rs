//! Scheduled task subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler.rs (interval tick)
//!     → timer.rs (start, run task, record name/status)
//!     → task result logged; schedule continues
//! ```

pub mod scheduler;
pub mod timer;

pub use scheduler::Scheduler;
pub use timer::SchedulingTimer;
