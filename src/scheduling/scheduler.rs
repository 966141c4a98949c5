//! Fixed-rate task dispatcher.
//!
//! # Responsibilities
//! - Run named tasks on Tokio intervals until shutdown
//! - Wrap every invocation with the installed `SchedulingTimer`
//! - Log task failures and panics; either way the task keeps its schedule

use futures_util::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::lifecycle::Shutdown;
use crate::scheduling::timer::SchedulingTimer;

/// Dispatches scheduled tasks.
pub struct Scheduler {
    timer: Option<Arc<SchedulingTimer>>,
    shutdown: Shutdown,
}

impl Scheduler {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            timer: None,
            shutdown,
        }
    }

    /// Install the invocation timer. Applies to tasks scheduled afterwards.
    pub fn set_timer(&mut self, timer: Arc<SchedulingTimer>) {
        self.timer = Some(timer);
    }

    pub fn timer(&self) -> Option<&Arc<SchedulingTimer>> {
        self.timer.as_ref()
    }

    /// Run one invocation of `task` through the timer, if any.
    pub async fn run_once<Fut, E>(&self, name: &str, task: Fut) -> Result<(), E>
    where
        Fut: Future<Output = Result<(), E>>,
        E: 'static,
    {
        invoke(self.timer.as_deref(), name, task).await
    }

    /// Run `task` every `period` until shutdown is triggered.
    ///
    /// A panicking invocation is logged and the next tick runs as usual.
    pub fn schedule_fixed_rate<F, Fut, E>(
        &self,
        name: impl Into<String>,
        period: Duration,
        task: F,
    ) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let name = name.into();
        let timer = self.timer.clone();
        let mut shutdown = self.shutdown.subscribe();

        tracing::info!(task = %name, period = ?period, timed = timer.is_some(), "Scheduling task");

        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let run = AssertUnwindSafe(async {
                            invoke(timer.as_deref(), &name, task()).await
                        });
                        match run.catch_unwind().await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                tracing::warn!(task = %name, error = %e, "Scheduled task failed");
                            }
                            Err(_) => {
                                tracing::error!(task = %name, "Scheduled task panicked");
                            }
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!(task = %name, "Scheduled task stopping");
                        break;
                    }
                }
            }
        })
    }
}

async fn invoke<Fut, E>(timer: Option<&SchedulingTimer>, name: &str, task: Fut) -> Result<(), E>
where
    Fut: Future<Output = Result<(), E>>,
    E: 'static,
{
    match timer {
        Some(timer) => timer.time(name, task).await,
        None => task.await,
    }
}
