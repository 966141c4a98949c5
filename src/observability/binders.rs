//! Process and runtime binders.
//!
//! # Metrics
//! - `process_resident_memory_bytes` (gauge): resident set size
//! - `process_virtual_memory_bytes` (gauge): virtual memory size
//! - `process_uptime_seconds` (gauge): time since the binder was created
//! - `tokio_runtime_workers` (gauge): worker threads of the current runtime
//! - `tokio_runtime_alive_tasks` (gauge): tasks alive in the current runtime
//!
//! # Design Decisions
//! - Memory is read from `/proc/self/statm`; other platforms report
//!   `BinderError::Unsupported` and the binder is not installed
//! - Gauges are refreshed on an interval, not on scrape

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::error::BinderError;

const STATM_PATH: &str = "/proc/self/statm";
const PAGE_SIZE: u64 = 4096;

/// Memory usage of the current process, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub virtual_bytes: u64,
    pub resident_bytes: u64,
}

/// Gauges describing the running process.
#[derive(Debug, Clone)]
pub struct ProcessMetrics {
    started: Instant,
    statm: PathBuf,
}

impl ProcessMetrics {
    /// Create a binder reading the current process's statistics.
    pub fn new() -> Self {
        Self::with_statm(STATM_PATH)
    }

    fn with_statm(path: impl Into<PathBuf>) -> Self {
        Self {
            started: Instant::now(),
            statm: path.into(),
        }
    }

    /// Check that statistics can be read at all.
    pub fn probe(&self) -> Result<(), BinderError> {
        read_memory(&self.statm).map(|_| ())
    }

    /// Read and publish every gauge once.
    pub fn bind(&self) -> Result<MemoryUsage, BinderError> {
        let memory = read_memory(&self.statm)?;

        metrics::gauge!("process_resident_memory_bytes").set(memory.resident_bytes as f64);
        metrics::gauge!("process_virtual_memory_bytes").set(memory.virtual_bytes as f64);
        metrics::gauge!("process_uptime_seconds").set(self.started.elapsed().as_secs_f64());

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let runtime = handle.metrics();
            metrics::gauge!("tokio_runtime_workers").set(runtime.num_workers() as f64);
            metrics::gauge!("tokio_runtime_alive_tasks").set(runtime.num_alive_tasks() as f64);
        }

        Ok(memory)
    }

    /// Refresh the gauges every `interval` until shutdown.
    pub fn spawn_refresh(
        self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.bind() {
                            tracing::warn!(error = %e, "Failed to refresh process metrics");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Process metrics refresh stopping");
                        break;
                    }
                }
            }
        })
    }
}

impl Default for ProcessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn read_memory(path: &Path) -> Result<MemoryUsage, BinderError> {
    if !cfg!(target_os = "linux") && path == Path::new(STATM_PATH) {
        return Err(BinderError::Unsupported);
    }

    let content = std::fs::read_to_string(path)?;
    parse_statm(&content)
}

/// Parse `/proc/self/statm` (sizes in pages: size resident shared ...).
fn parse_statm(content: &str) -> Result<MemoryUsage, BinderError> {
    let mut fields = content.split_whitespace().map(|f| {
        f.parse::<u64>()
            .map_err(|_| BinderError::Malformed(format!("non-numeric field '{}'", f)))
    });

    let size = fields
        .next()
        .ok_or_else(|| BinderError::Malformed("missing size".into()))??;
    let resident = fields
        .next()
        .ok_or_else(|| BinderError::Malformed("missing resident".into()))??;

    Ok(MemoryUsage {
        virtual_bytes: size * PAGE_SIZE,
        resident_bytes: resident * PAGE_SIZE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statm() {
        let usage = parse_statm("2000 500 100 10 0 300 0\n").unwrap();
        assert_eq!(usage.virtual_bytes, 2000 * PAGE_SIZE);
        assert_eq!(usage.resident_bytes, 500 * PAGE_SIZE);
    }

    #[test]
    fn test_parse_statm_malformed() {
        assert!(matches!(parse_statm(""), Err(BinderError::Malformed(_))));
        assert!(matches!(parse_statm("12 abc"), Err(BinderError::Malformed(_))));
    }

    #[test]
    fn test_missing_statm_file() {
        let binder = ProcessMetrics::with_statm("/definitely/not/statm");
        assert!(matches!(binder.probe(), Err(BinderError::Io(_))));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_bind_reads_current_process() {
        let usage = ProcessMetrics::new().bind().unwrap();
        assert!(usage.resident_bytes > 0);
        assert!(usage.virtual_bytes >= usage.resident_bytes);
    }
}
