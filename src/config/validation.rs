//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Meter names must be non-empty and distinct
//! - Addresses must parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MetricsConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::MetricsConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("meter name '{field}' must not be empty")]
    EmptyMeterName { field: &'static str },

    #[error("meter name '{name}' is used by both {first} and {second}")]
    DuplicateMeterName {
        name: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("invalid meter name '{name}' for {field}: only [A-Za-z0-9_.] allowed")]
    InvalidMeterName { field: &'static str, name: String },

    #[error("invalid socket address '{value}' for {field}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &MetricsConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let names = [
        ("web.server_requests.name", &config.web.server_requests.name),
        ("web.client_requests.name", &config.web.client_requests.name),
        ("scheduling.name", &config.scheduling.name),
    ];

    for (field, name) in names {
        if name.is_empty() {
            errors.push(ValidationError::EmptyMeterName { field });
        } else if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            errors.push(ValidationError::InvalidMeterName {
                field,
                name: name.to_string(),
            });
        }
    }

    for (i, (first, a)) in names.iter().enumerate() {
        for (second, b) in names.iter().skip(i + 1) {
            if !a.is_empty() && a == b {
                errors.push(ValidationError::DuplicateMeterName {
                    name: a.to_string(),
                    first,
                    second,
                });
            }
        }
    }

    let addresses = [
        ("listener.bind_address", &config.listener.bind_address),
        ("observability.metrics_address", &config.observability.metrics_address),
    ];
    for (field, value) in addresses {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
        }
    }

    match config.observability.log_level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => errors.push(ValidationError::UnknownLogLevel(other.to_string())),
    }

    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "listener.request_timeout_secs",
        });
    }
    if config.binders.refresh_interval_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "binders.refresh_interval_secs",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = MetricsConfig::default();
        config.web.server_requests.name = String::new();
        config.web.client_requests.name = "scheduled_tasks".into();
        config.observability.log_level = "loud".into();
        config.listener.bind_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyMeterName {
            field: "web.server_requests.name"
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateMeterName { .. })));
        assert!(errors.contains(&ValidationError::UnknownLogLevel("loud".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidAddress { field: "listener.bind_address", .. })));
    }

    #[test]
    fn test_rejects_illegal_characters() {
        let mut config = MetricsConfig::default();
        config.web.client_requests.name = "http client".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::InvalidMeterName { .. }));
    }
}
