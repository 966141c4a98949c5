//! Meter registry seam.
//!
//! # Responsibilities
//! - Accept named, tagged timing observations
//! - Forward them to the global `metrics` recorder (production)
//! - Keep them in memory for inspection (tests, diagnostics)
//!
//! # Design Decisions
//! - The registry is the only shared mutable collaborator; every
//!   implementation must be safe under concurrent recording
//! - Recording is synchronous and cheap; instrumentation never awaits it
//! - Durations are exported in seconds, the Prometheus convention

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::RecordError;
use crate::observability::tags::TagSet;

/// Sink for named, tagged timing observations.
pub trait MeterRegistry: Send + Sync {
    fn record(&self, name: &str, tags: &TagSet, duration: Duration) -> Result<(), RecordError>;
}

/// Registry backed by the global `metrics` recorder.
///
/// Each observation becomes a histogram sample (seconds) under the meter
/// name, labelled with the tag set.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRegistry;

impl MeterRegistry for MetricsRegistry {
    fn record(&self, name: &str, tags: &TagSet, duration: Duration) -> Result<(), RecordError> {
        metrics::histogram!(name.to_string(), tags.to_labels()).record(duration.as_secs_f64());
        Ok(())
    }
}

/// A single recorded measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: String,
    pub tags: TagSet,
    pub duration: Duration,
}

/// Aggregate for one (name, tags) timer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerSnapshot {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

/// In-memory registry.
///
/// Keeps every observation in arrival order plus a per-timer aggregate.
#[derive(Debug, Default)]
pub struct SimpleMeterRegistry {
    observations: Mutex<Vec<Observation>>,
    timers: DashMap<(String, TagSet), TimerSnapshot>,
    closed: AtomicBool,
}

impl SimpleMeterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All observations recorded so far, oldest first.
    pub fn observations(&self) -> Vec<Observation> {
        self.observations
            .lock()
            .map(|obs| obs.clone())
            .unwrap_or_default()
    }

    /// Observations recorded under `name`.
    pub fn observations_named(&self, name: &str) -> Vec<Observation> {
        self.observations()
            .into_iter()
            .filter(|o| o.name == name)
            .collect()
    }

    /// Aggregate for an exact (name, tags) pair.
    pub fn timer(&self, name: &str, tags: &TagSet) -> Option<TimerSnapshot> {
        self.timers
            .get(&(name.to_string(), tags.clone()))
            .map(|t| *t)
    }

    /// Number of distinct (name, tags) timers.
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Reject every further recording.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl MeterRegistry for SimpleMeterRegistry {
    fn record(&self, name: &str, tags: &TagSet, duration: Duration) -> Result<(), RecordError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RecordError::Closed);
        }

        let mut timer = self
            .timers
            .entry((name.to_string(), tags.clone()))
            .or_default();
        timer.count += 1;
        timer.total += duration;
        timer.max = timer.max.max(duration);
        drop(timer);

        let mut observations = self.observations.lock().map_err(|_| RecordError::Rejected {
            name: name.to_string(),
            reason: "observation log poisoned".to_string(),
        })?;
        observations.push(Observation {
            name: name.to_string(),
            tags: tags.clone(),
            duration,
        });
        Ok(())
    }
}

/// Record an observation, logging and swallowing any registry failure.
///
/// Instrumentation must never fail the request it observes.
pub(crate) fn record_quietly(
    registry: &dyn MeterRegistry,
    name: &str,
    tags: &TagSet,
    duration: Duration,
) {
    if let Err(e) = registry.record(name, tags, duration) {
        tracing::warn!(meter = %name, tags = %tags, error = %e, "Failed to record observation");
    } else {
        tracing::trace!(meter = %name, tags = %tags, elapsed = ?duration, "Observation recorded");
    }
}
