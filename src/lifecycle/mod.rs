//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Restore history → Build collaborators
//!     → Start processing loop → Bind listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal or fatal conflict → Broadcast → Stop loop → Stop listeners
//!     → Save history snapshot → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Fail fast: any startup error is fatal
//! - A fatal conflict exits non-zero after the same orderly shutdown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{App, ExitReason};
