//! Chat relay library.
//!
//! Accepts inbound chat messages, keeps a bounded history per conversation,
//! and runs a self-healing scheduler that generates and delivers replies
//! through injected collaborators.

pub mod admin;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod scheduler;

pub use config::schema::RelayConfig;
pub use conversation::{ConversationId, ConversationQueue, Message};
pub use lifecycle::{App, ExitReason, Shutdown};
pub use scheduler::{ProcessingLoop, ResponseExecutor, SchedulerContext};
