//! Prometheus exposition for the demo binary.
//!
//! Aggregation and export belong to the host; this is the glue the binary
//! uses to install a global recorder with a scrape listener.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::error::InstallError;

/// Install the Prometheus recorder and spawn its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), InstallError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| InstallError::Exporter(e.to_string()))?;

    tracing::info!(address = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}
