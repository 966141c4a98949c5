//! Demo service with request timing metrics.
//!
//! ```text
//!   inbound request ──▶ server timer ──▶ handler ──▶ response
//!                                           │
//!                                           ▼
//!                        RestClient ──▶ client timer ──▶ upstream
//!
//!   scheduler tick ──▶ scheduled task timer ──▶ heartbeat task
//!
//!   all timers ──▶ MeterRegistry ──▶ Prometheus exporter (/metrics)
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

use web_metrics::client::RestClientFactory;
use web_metrics::config::{load_config, MetricsConfig};
use web_metrics::observability::exporter::init_metrics;
use web_metrics::observability::logging::init_logging;
use web_metrics::observability::MetricsRegistry;
use web_metrics::scheduling::Scheduler;
use web_metrics::{ApplicationType, HttpServer, MetricsAutoConfiguration, Shutdown};

#[derive(Parser)]
#[command(name = "web-metrics")]
#[command(about = "Demo service with request timing metrics", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server timer variant.
    #[arg(long, value_enum, default_value_t = Mode::Servlet)]
    mode: Mode,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Servlet,
    Reactive,
}

impl From<Mode> for ApplicationType {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Servlet => ApplicationType::Servlet,
            Mode::Reactive => ApplicationType::Reactive,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MetricsConfig::default(),
    };

    let metrics = MetricsAutoConfiguration::builder(config.clone())
        .registry(Arc::new(MetricsRegistry))
        .build()?;

    init_logging(&config.observability, metrics.install_logging_binder())?;

    tracing::info!("web-metrics v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.listener.request_timeout_secs,
        server_requests = %config.web.server_requests.name,
        client_requests = %config.web.client_requests.name,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown.clone().trigger_on_ctrl_c());

    match metrics.install_process_binder() {
        Ok(binder) => {
            binder.spawn_refresh(
                Duration::from_secs(config.binders.refresh_interval_secs),
                shutdown.subscribe(),
            );
        }
        Err(e) => tracing::info!(reason = %e, "Process metrics not installed"),
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let mut factory = RestClientFactory::with_hyper();
    metrics.install_client_timer(&mut factory);
    if let Err(e) = metrics.install_url_template_capture(&mut factory) {
        tracing::info!(reason = %e, "Client requests will not carry URL templates");
    }
    let client = factory.build_with(Some(Url::parse(&format!("http://{local_addr}/"))?), Vec::new());

    let mut scheduler = Scheduler::new(shutdown.clone());
    if let Err(e) = metrics.install_scheduled_timer(&mut scheduler) {
        tracing::info!(reason = %e, "Scheduled tasks will not be timed");
    }
    let heartbeat_client = client.clone();
    scheduler.schedule_fixed_rate("heartbeat", Duration::from_secs(30), move || {
        let client = heartbeat_client.clone();
        async move { client.get_for_string::<u32>("/health", &[]).await.map(|_| ()) }
    });

    let server = HttpServer::new(&metrics, cli.mode.into(), client);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
