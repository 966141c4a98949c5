//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use web_metrics::client::RestClientFactory;
use web_metrics::observability::SimpleMeterRegistry;
use web_metrics::{ApplicationType, HttpServer, MetricsAutoConfiguration, MetricsConfig, Shutdown};

/// Start a programmable mock backend. `f` receives the request path.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]);
                        let path = head
                            .split_whitespace()
                            .nth(1)
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Metrics wiring over an in-memory registry.
#[allow(dead_code)]
pub fn metrics(config: MetricsConfig) -> (Arc<SimpleMeterRegistry>, MetricsAutoConfiguration) {
    let registry = Arc::new(SimpleMeterRegistry::new());
    let metrics = MetricsAutoConfiguration::builder(config)
        .registry(registry.clone())
        .build()
        .unwrap();
    (registry, metrics)
}

/// Client factory with the client timer and template capture installed.
#[allow(dead_code)]
pub fn instrumented_factory(metrics: &MetricsAutoConfiguration) -> RestClientFactory {
    let mut factory = RestClientFactory::with_hyper();
    metrics.install_client_timer(&mut factory);
    let _ = metrics.install_url_template_capture(&mut factory);
    factory
}

/// Start the demo server on an ephemeral port. Its client calls the server
/// itself.
#[allow(dead_code)]
pub async fn start_server(
    metrics: &MetricsAutoConfiguration,
    application_type: ApplicationType,
    shutdown: &Shutdown,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let base = url::Url::parse(&format!("http://{addr}/")).unwrap();
    let client = instrumented_factory(metrics).build_with(Some(base), Vec::new());

    let server = HttpServer::new(metrics, application_type, client);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    addr
}

/// Wait until `check` holds, polling briefly.
#[allow(dead_code)]
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..50 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(check(), "condition not reached in time");
}
