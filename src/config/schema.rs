//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the chat relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Processing loop timing and self-healing thresholds.
    pub scheduler: SchedulerConfig,

    /// Retry configuration for a single response attempt.
    pub retries: RetryConfig,

    /// Global circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Conversation history limits and snapshotting.
    pub history: HistoryConfig,

    /// Inbound message endpoint.
    pub ingest: IngestConfig,

    /// Admin API.
    pub admin: AdminConfig,

    /// Downstream response generator.
    pub dispatcher: DispatcherConfig,

    /// Outbound delivery channel.
    pub delivery: DeliveryConfig,

    /// Image description collaborator.
    pub enrichment: EnrichmentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Processing loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay before the first cycle after a start, in milliseconds.
    pub initial_delay_ms: u64,

    /// Wait between two cycles, in milliseconds.
    pub poll_interval_ms: u64,

    /// Consecutive failed conversations before the loop stops itself.
    pub max_consecutive_errors: u32,

    /// Cooldown before a self-stopped loop restarts, in milliseconds.
    pub restart_cooldown_ms: u64,
}

impl SchedulerConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn restart_cooldown(&self) -> Duration {
        Duration::from_millis(self.restart_cooldown_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            poll_interval_ms: 33_333,
            max_consecutive_errors: 5,
            restart_cooldown_ms: 30_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds (before jitter).
    pub max_delay_ms: u64,

    /// Upper bound (exclusive) of the random jitter added to each delay.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ms: 1_000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Retryable failures before the breaker opens.
    pub max_failures: u32,

    /// Time since the last failure after which an open breaker closes again.
    pub timeout_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 10,
            timeout_ms: 300_000,
        }
    }
}

/// Conversation history configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Messages kept per conversation; older entries are evicted.
    pub max_messages: usize,

    /// Optional JSON snapshot loaded at startup and written at shutdown.
    pub snapshot_path: Option<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            snapshot_path: None,
        }
    }
}

/// Inbound message endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds. Covers enrichment of inbound images.
    pub request_timeout_secs: u64,

    /// Maximum accepted body size in bytes.
    pub max_body_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 256 * 1024,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Response generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Endpoint receiving `{conversation_id, messages}` and returning a reply.
    pub endpoint: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000/generate".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Delivery channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Endpoint receiving typing/text/image delivery actions.
    pub endpoint: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9001/deliver".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Image enrichment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Call the describer for inbound images. When off, images get the placeholder.
    pub enabled: bool,

    /// Endpoint receiving `{image_url}` and returning `{description}`.
    pub endpoint: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Text stored in place of a description that could not be produced.
    pub placeholder: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:9002/describe".to_string(),
            timeout_secs: 20,
            placeholder: "[image could not be described]".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
