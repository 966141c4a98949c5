//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber (env filter + fmt)
//! - Optionally count log events per level (`log_events_total`)
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when present
//! - The counting layer is a plain `tracing_subscriber::Layer`, so it only
//!   sees events that pass the filter

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::error::{BinderError, InstallError};

/// Counter name for log events by level.
pub const LOG_EVENTS_TOTAL: &str = "log_events_total";

/// Layer that increments `log_events_total{level}` for every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventMetricsLayer;

impl<S: Subscriber> Layer<S> for LogEventMetricsLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = level_label(event.metadata().level());
        metrics::counter!(LOG_EVENTS_TOTAL, "level" => level).increment(1);
    }
}

fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Install the global subscriber.
///
/// `binder` is the optional log-event counting layer handed out by
/// `MetricsAutoConfiguration::install_logging_binder`.
pub fn init_logging(
    config: &ObservabilityConfig,
    binder: Option<LogEventMetricsLayer>,
) -> Result<(), InstallError> {
    let level = config.log_level.to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("web_metrics={level},tower_http={level}").into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(binder)
        .try_init()
        .map_err(|_| InstallError::Binder(BinderError::AlreadyInstalled))
}
