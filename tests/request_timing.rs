//! End-to-end request timing tests over real sockets.

use std::sync::Arc;
use std::time::Duration;

use web_metrics::client::ClientError;
use web_metrics::observability::{SimpleMeterRegistry, TagSet};
use web_metrics::scheduling::Scheduler;
use web_metrics::{ApplicationType, MetricsConfig, Shutdown};

mod common;

fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_server_request_timed_with_route_template() {
    let (registry, metrics) = common::metrics(MetricsConfig::default());
    let shutdown = Shutdown::new();
    let addr = common::start_server(&metrics, ApplicationType::Servlet, &shutdown).await;

    let res = http()
        .get(format!("http://{addr}/users/42"))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);

    common::eventually(|| registry.observations_named("http_server_requests").len() == 1).await;
    let tags = TagSet::new()
        .and("method", "GET")
        .and("uri", "/users/{id}")
        .and("status", "200")
        .and("exception", "None");
    let timer = registry.timer("http_server_requests", &tags).expect("timer registered");
    assert_eq!(timer.count, 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_handler_error_timed_as_server_error() {
    let (registry, metrics) = common::metrics(MetricsConfig::default());
    let shutdown = Shutdown::new();
    let addr = common::start_server(&metrics, ApplicationType::Reactive, &shutdown).await;

    let res = http()
        .post(format!("http://{addr}/orders"))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 500);

    common::eventually(|| !registry.observations().is_empty()).await;
    let observation = &registry.observations_named("http_server_requests")[0];
    assert_eq!(observation.tags.get("method"), Some("POST"));
    assert_eq!(observation.tags.get("uri"), Some("/orders"));
    assert_eq!(observation.tags.get("status"), Some("SERVER_ERROR"));
    assert_eq!(observation.tags.get("exception"), Some("OrderRejected"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_repeated_requests_share_one_timer() {
    let (registry, metrics) = common::metrics(MetricsConfig::default());
    let shutdown = Shutdown::new();
    let addr = common::start_server(&metrics, ApplicationType::Servlet, &shutdown).await;

    let client = http();
    for id in [1, 2, 3] {
        let res = client
            .get(format!("http://{addr}/users/{id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    common::eventually(|| registry.observations().len() == 3).await;
    assert_eq!(registry.timer_count(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_proxy_route_times_both_sides() {
    let (registry, metrics) = common::metrics(MetricsConfig::default());
    let shutdown = Shutdown::new();
    let addr = common::start_server(&metrics, ApplicationType::Servlet, &shutdown).await;

    let res = http()
        .get(format!("http://{addr}/proxy/users/7"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains("user-7"));

    common::eventually(|| registry.observations_named("http_server_requests").len() == 2).await;

    let client = registry.observations_named("http_client_requests");
    assert_eq!(client.len(), 1);
    assert_eq!(client[0].tags.get("uri"), Some("/users/{id}"));
    assert_eq!(client[0].tags.get("status"), Some("200"));
    assert_eq!(client[0].tags.get("clientName"), Some("127.0.0.1"));

    let routes: Vec<_> = registry
        .observations_named("http_server_requests")
        .iter()
        .map(|o| o.tags.get("uri").unwrap_or_default().to_string())
        .collect();
    assert!(routes.contains(&"/users/{id}".to_string()));
    assert!(routes.contains(&"/proxy/users/{id}".to_string()));

    shutdown.trigger();
}

#[tokio::test]
async fn test_client_request_against_backend() {
    let backend = common::start_programmable_backend(|path| async move {
        if path == "/users/42" {
            (200, "{\"id\":42}".to_string())
        } else {
            (404, "missing".to_string())
        }
    })
    .await;

    let (registry, metrics) = common::metrics(MetricsConfig::default());
    let base = url::Url::parse(&format!("http://{backend}/")).unwrap();
    let client = common::instrumented_factory(&metrics).build_with(Some(base), Vec::new());

    let body = client.get_for_string("/users/{id}", &[42]).await.unwrap();
    assert_eq!(body, "{\"id\":42}");

    let response = client.get("/users/{id}", &[7]).await.unwrap();
    assert_eq!(response.status(), 404);

    let observations = registry.observations_named("http_client_requests");
    assert_eq!(observations.len(), 2);
    assert_eq!(observations[0].tags.get("method"), Some("GET"));
    assert_eq!(observations[0].tags.get("uri"), Some("/users/{id}"));
    assert_eq!(observations[0].tags.get("status"), Some("200"));
    assert_eq!(observations[1].tags.get("status"), Some("404"));
}

#[tokio::test]
async fn test_client_connection_failure_is_io_error() {
    let addr = common::closed_addr().await;
    let (registry, metrics) = common::metrics(MetricsConfig::default());
    let base = url::Url::parse(&format!("http://{addr}/")).unwrap();
    let client = common::instrumented_factory(&metrics).build_with(Some(base), Vec::new());

    let result = client.get("/users/{id}", &[1]).await;
    assert!(matches!(result, Err(ClientError::Transport(_))));

    let observations = registry.observations_named("http_client_requests");
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].tags.get("status"), Some("IO_ERROR"));
    assert_eq!(observations[0].tags.get("uri"), Some("/users/{id}"));
}

#[tokio::test]
async fn test_interception_disabled_drops_client_template() {
    let backend = common::start_programmable_backend(|_| async { (200, "ok".to_string()) }).await;

    let mut config = MetricsConfig::default();
    config.interception.enabled = false;
    let (registry, metrics) = common::metrics(config);
    let base = url::Url::parse(&format!("http://{backend}/")).unwrap();
    let client = common::instrumented_factory(&metrics).build_with(Some(base), Vec::new());

    client.get("/users/{id}", &[42]).await.unwrap();

    let observations = registry.observations_named("http_client_requests");
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].tags.get("uri"), Some("none"));
}

#[tokio::test]
async fn test_custom_meter_names() {
    let backend = common::start_programmable_backend(|_| async { (200, "ok".to_string()) }).await;

    let config = web_metrics::config::parse_config(
        r#"
        [web.client_requests]
        name = "outbound"
        "#,
    )
    .unwrap();
    let (registry, metrics) = common::metrics(config);
    let base = url::Url::parse(&format!("http://{backend}/")).unwrap();
    let client = common::instrumented_factory(&metrics).build_with(Some(base), Vec::new());

    client.get::<u32>("/ping", &[]).await.unwrap();

    assert_eq!(registry.observations_named("outbound").len(), 1);
    assert!(registry.observations_named("http_client_requests").is_empty());
}

#[derive(Debug, thiserror::Error)]
#[error("report source unavailable")]
struct ReportUnavailable;

#[tokio::test]
async fn test_scheduled_task_outcomes() {
    let registry = Arc::new(SimpleMeterRegistry::new());
    let metrics = web_metrics::MetricsAutoConfiguration::builder(MetricsConfig::default())
        .registry(registry.clone())
        .build()
        .unwrap();

    let shutdown = Shutdown::new();
    let mut scheduler = Scheduler::new(shutdown.clone());
    metrics.install_scheduled_timer(&mut scheduler).unwrap();

    scheduler
        .run_once("nightlyReport", async { Ok::<_, ReportUnavailable>(()) })
        .await
        .unwrap();
    let failed = scheduler
        .run_once("nightlyReport", async { Err(ReportUnavailable) })
        .await;
    assert!(failed.is_err());

    let observations = registry.observations_named("scheduled_tasks");
    assert_eq!(observations.len(), 2);
    assert_eq!(observations[0].tags.get("name"), Some("nightlyReport"));
    assert_eq!(observations[0].tags.get("status"), Some("SUCCESS"));
    assert_eq!(observations[1].tags.get("status"), Some("FAILURE"));
    assert_eq!(observations[1].tags.get("exception"), Some("ReportUnavailable"));

    let handle = scheduler.schedule_fixed_rate("tick", Duration::from_millis(10), || async {
        Ok::<_, ReportUnavailable>(())
    });
    common::eventually(|| registry.observations_named("scheduled_tasks").len() >= 4).await;
    shutdown.trigger();
    handle.await.unwrap();
}
