//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the metrics
//! wiring. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default meter name for inbound server requests.
pub const DEFAULT_SERVER_REQUESTS_NAME: &str = "http_server_requests";

/// Default meter name for outbound client requests.
pub const DEFAULT_CLIENT_REQUESTS_NAME: &str = "http_client_requests";

/// Default meter name for scheduled task invocations.
pub const DEFAULT_SCHEDULED_TASKS_NAME: &str = "scheduled_tasks";

/// Root configuration for the metrics wiring.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Listener configuration for the demo server.
    pub listener: ListenerConfig,

    /// Web instrumentation settings (server and client meters).
    pub web: WebConfig,

    /// Cross-cutting interception (URL template capture, scheduled tasks).
    pub interception: InterceptionConfig,

    /// Scheduled task instrumentation.
    pub scheduling: SchedulingConfig,

    /// Recommended binders.
    pub binders: BindersConfig,

    /// Tag value formatting.
    pub tags: TagsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl MetricsConfig {
    /// Resolve a dotted property key against this configuration.
    ///
    /// Both the framework-style keys (`spring.metrics.web.server_requests.name`)
    /// and the schema paths (`web.server_requests.name`) are accepted.
    pub fn property(&self, key: &str) -> Option<String> {
        let key = key
            .strip_prefix("spring.metrics.")
            .or_else(|| key.strip_prefix("spring."))
            .unwrap_or(key);

        match key {
            "web.server_requests.name" => Some(self.web.server_requests.name.clone()),
            "web.client_requests.name" => Some(self.web.client_requests.name.clone()),
            "aop.enabled" | "interception.enabled" => Some(self.interception.enabled.to_string()),
            "scheduling.name" => Some(self.scheduling.name.clone()),
            "binders.process" => Some(self.binders.process.to_string()),
            "binders.logging" => Some(self.binders.logging.to_string()),
            "tags.normalize_ids" => Some(self.tags.normalize_ids.to_string()),
            "tags.request_introspection" => Some(self.tags.request_introspection.to_string()),
            "observability.log_level" => Some(self.observability.log_level.clone()),
            "observability.metrics_enabled" => Some(self.observability.metrics_enabled.to_string()),
            "observability.metrics_address" => Some(self.observability.metrics_address.clone()),
            "listener.bind_address" => Some(self.listener.bind_address.clone()),
            _ => None,
        }
    }

    /// Resolve a property, falling back to `default` when unknown.
    pub fn property_or(&self, key: &str, default: &str) -> String {
        self.property(key).unwrap_or_else(|| default.to_string())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Web instrumentation configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WebConfig {
    pub server_requests: ServerRequestsConfig,
    pub client_requests: ClientRequestsConfig,
}

/// Inbound request meter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerRequestsConfig {
    pub name: String,
}

impl Default for ServerRequestsConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_REQUESTS_NAME.to_string(),
        }
    }
}

/// Outbound request meter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientRequestsConfig {
    pub name: String,
}

impl Default for ClientRequestsConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLIENT_REQUESTS_NAME.to_string(),
        }
    }
}

/// Cross-cutting interception configuration.
///
/// When disabled, outbound client calls are still timed but their `uri` tag
/// always evaluates to `none`, and scheduled tasks are not timed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptionConfig {
    pub enabled: bool,
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Scheduled task instrumentation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Meter name for scheduled task timings.
    pub name: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SCHEDULED_TASKS_NAME.to_string(),
        }
    }
}

/// Recommended binders.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BindersConfig {
    /// Process memory, uptime and runtime gauges.
    pub process: bool,

    /// Log event counters by level.
    pub logging: bool,

    /// Refresh interval for process gauges in seconds.
    pub refresh_interval_secs: u64,
}

impl Default for BindersConfig {
    fn default() -> Self {
        Self {
            process: true,
            logging: true,
            refresh_interval_secs: 15,
        }
    }
}

/// Tag value formatting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TagsConfig {
    /// Collapse numeric and UUID path segments in tag values to `{id}`.
    pub normalize_ids: bool,

    /// Derive `uri` and `clientName` from the request. When false, only the
    /// required keys are emitted with sentinel values.
    pub request_introspection: bool,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            normalize_ids: false,
            request_introspection: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
