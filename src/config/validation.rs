//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, thresholds >= 1)
//! - Check that collaborator endpoints and bind addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("retries.max_delay_ms ({max}) is lower than retries.base_delay_ms ({base})")]
    DelayOrder { base: u64, max: u64 },

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingApiKey,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive: [(&'static str, u64); 8] = [
        ("scheduler.poll_interval_ms", config.scheduler.poll_interval_ms),
        (
            "scheduler.max_consecutive_errors",
            u64::from(config.scheduler.max_consecutive_errors),
        ),
        ("retries.base_delay_ms", config.retries.base_delay_ms),
        (
            "circuit_breaker.max_failures",
            u64::from(config.circuit_breaker.max_failures),
        ),
        ("circuit_breaker.timeout_ms", config.circuit_breaker.timeout_ms),
        ("history.max_messages", config.history.max_messages as u64),
        ("dispatcher.timeout_secs", config.dispatcher.timeout_secs),
        ("delivery.timeout_secs", config.delivery.timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.retries.max_delay_ms < config.retries.base_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    check_url(&mut errors, "dispatcher.endpoint", &config.dispatcher.endpoint);
    check_url(&mut errors, "delivery.endpoint", &config.delivery.endpoint);
    if config.enrichment.enabled {
        check_url(&mut errors, "enrichment.endpoint", &config.enrichment.endpoint);
    }

    check_address(&mut errors, "ingest.bind_address", &config.ingest.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingApiKey);
        }
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&RelayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RelayConfig::default();
        config.scheduler.poll_interval_ms = 0;
        config.circuit_breaker.max_failures = 0;
        config.dispatcher.endpoint = "not a url".into();
        config.retries.max_delay_ms = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero {
            field: "scheduler.poll_interval_ms"
        }));
        assert!(errors.contains(&ValidationError::DelayOrder { base: 1_000, max: 10 }));
    }

    #[test]
    fn test_admin_checks_only_when_enabled() {
        let mut config = RelayConfig::default();
        config.admin.api_key = String::new();
        assert!(validate_config(&config).is_ok());

        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingApiKey]);
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = RelayConfig::default();
        config.delivery.endpoint = "ftp://example.com/deliver".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::InvalidUrl { field: "delivery.endpoint", .. }
        ));
    }
}
