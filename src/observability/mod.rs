//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (conversation_id, attempt, kind) on every scheduler event
//! - Metrics go through the `metrics` facade; without an installed recorder they are no-ops
//! - Log level from config, overridable with RUST_LOG

pub mod logging;
pub mod metrics;
