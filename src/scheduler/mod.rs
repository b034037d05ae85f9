//! Resilient processing scheduler.
//!
//! # Data Flow
//! ```text
//! processing_loop.rs (control task)
//!     sleep initial delay / poll interval
//!     → context.rs: breaker open? skip cycle
//!     → ConversationQueue snapshot, due conversations only
//!     → executor.rs per conversation, one at a time
//!         → typing → generate → deliver, retry with backoff
//!         → context.rs: breaker failures / reset
//!     → context.rs: consecutive-error streak
//!     → streak at threshold: stop, cooldown, fresh start
//! ```
//!
//! # Design Decisions
//! - One cycle at a time and one conversation at a time; the breaker and the
//!   streak counter never see concurrent writers
//! - State lives in an explicit `SchedulerContext`, no globals
//! - Stopping cancels sleeps, never an attempt in flight
//! - A breaker-induced skip resets the streak like a success
//! - Fatal conflicts are reported through a watch channel; the binary exits

pub mod context;
pub mod error;
pub mod executor;
pub mod processing_loop;

pub use context::{SchedulerContext, SchedulerStatus};
pub use error::ProcessError;
pub use executor::{AttemptOutcome, ResponseExecutor};
pub use processing_loop::{CycleExit, CycleReport, ProcessingLoop};
