//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the demo handlers
//! - Install the server request timer (interceptor or layer variant)
//! - Wire up middleware (timeout, tracing)
//! - Serve until the shutdown signal fires
//!
//! # Routes
//! ```text
//! GET  /health              → "ok"
//! GET  /users/{id}          → JSON user
//! POST /orders              → always fails (OrderRejected, 500)
//! GET  /proxy/users/{id}    → fetches /users/{id} through the timed client
//! ```

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::autoconfig::{ApplicationType, MetricsAutoConfiguration};
use crate::client::RestClient;
use crate::config::MetricsConfig;
use crate::http::error::HandlerError;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: RestClient,
}

/// Demo HTTP server with request timing installed.
pub struct HttpServer {
    router: Router,
    config: MetricsConfig,
}

impl HttpServer {
    /// Create the server. `client` is used by the proxy route.
    pub fn new(
        metrics: &MetricsAutoConfiguration,
        application_type: ApplicationType,
        client: RestClient,
    ) -> Self {
        let config = metrics.config().clone();
        let router = Self::build_router(&config, metrics, application_type, AppState { client });
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The timeout sits inside the timer, so a timed-out request is
    /// recorded with the timeout status.
    #[allow(deprecated)]
    fn build_router(
        config: &MetricsConfig,
        metrics: &MetricsAutoConfiguration,
        application_type: ApplicationType,
        state: AppState,
    ) -> Router {
        let router = Router::new()
            .route("/health", get(health))
            .route("/users/{id}", get(get_user))
            .route("/orders", post(create_order))
            .route("/proxy/users/{id}", get(proxy_user))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )));

        metrics
            .install_server_timer(application_type, router)
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }
}

/// Raised by `POST /orders`.
#[derive(Debug, thiserror::Error)]
#[error("orders are not accepted: {0}")]
pub struct OrderRejected(pub String);

async fn health() -> &'static str {
    "ok"
}

async fn get_user(Path(id): Path<u64>) -> impl IntoResponse {
    Json(serde_json::json!({ "id": id, "name": format!("user-{id}") }))
}

async fn create_order() -> Result<StatusCode, HandlerError> {
    Err(OrderRejected("inventory is closed".to_string()).into())
}

async fn proxy_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<String, HandlerError> {
    tracing::debug!(id, "Proxying user lookup");
    state
        .client
        .get_for_string("/users/{id}", &[id])
        .await
        .map_err(|e| HandlerError::new(e).with_status(StatusCode::BAD_GATEWAY))
}
