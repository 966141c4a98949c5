//! Scheduled task timer.
//!
//! # Tags
//! - `name`: task identifier
//! - `status`: `SUCCESS`, `FAILURE` or `CANCELLED`
//! - `exception`: simple type name of the error (failures only)

use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;

use crate::http::tags::simple_type_name;
use crate::observability::registry::{record_quietly, MeterRegistry};
use crate::observability::tags::TagSet;

/// Times scheduled task invocations.
pub struct SchedulingTimer {
    registry: Arc<dyn MeterRegistry>,
    metric_name: String,
}

impl SchedulingTimer {
    pub fn new(registry: Arc<dyn MeterRegistry>, metric_name: impl Into<String>) -> Self {
        Self {
            registry,
            metric_name: metric_name.into(),
        }
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    /// Run `task`, record its duration and outcome, and return its result.
    ///
    /// Panics are recorded as `FAILURE` / `Panic` and then resumed.
    pub async fn time<F, T, E>(&self, task_name: &str, task: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: 'static,
    {
        let mut pending = PendingTask {
            timer: self,
            task_name,
            start: Instant::now(),
            recorded: false,
        };

        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(value)) => {
                pending.finish("SUCCESS", None);
                Ok(value)
            }
            Ok(Err(error)) => {
                pending.finish("FAILURE", Some(simple_type_name::<E>()));
                Err(error)
            }
            Err(panic) => {
                pending.finish("FAILURE", Some("Panic"));
                std::panic::resume_unwind(panic)
            }
        }
    }
}

struct PendingTask<'a> {
    timer: &'a SchedulingTimer,
    task_name: &'a str,
    start: Instant,
    recorded: bool,
}

impl PendingTask<'_> {
    fn finish(&mut self, status: &str, exception: Option<&str>) {
        if std::mem::replace(&mut self.recorded, true) {
            return;
        }

        let mut tags = TagSet::with_capacity(3)
            .and("name", self.task_name)
            .and("status", status);
        if let Some(exception) = exception {
            tags.push("exception", exception);
        }
        record_quietly(
            self.timer.registry.as_ref(),
            &self.timer.metric_name,
            &tags,
            self.start.elapsed(),
        );
    }
}

impl Drop for PendingTask<'_> {
    fn drop(&mut self) {
        self.finish("CANCELLED", None);
    }
}
