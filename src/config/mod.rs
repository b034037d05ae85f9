//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), path from --config / RELAY_CONFIG
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → sections handed to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, parse_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use schema::{
    AdminConfig, CircuitBreakerConfig, DeliveryConfig, DispatcherConfig, EnrichmentConfig,
    HistoryConfig, IngestConfig, LogFormat, ObservabilityConfig, RelayConfig, RetryConfig,
    SchedulerConfig,
};
