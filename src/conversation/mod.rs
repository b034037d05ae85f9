//! Conversation subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound message (relay)
//!     → queue.rs (remember the conversation id)
//!     → history.rs (append, evict oldest past the cap)
//!
//! Processing cycle (scheduler):
//!     → queue.rs (snapshot of known ids)
//!     → history.rs (last role decides whether a reply is due)
//! ```
//!
//! # Design Decisions
//! - "Due" is derived from the last stored role, never stored separately
//! - The id set only grows; history length is what gets bounded
//! - History snapshots are plain JSON, written on shutdown

pub mod history;
pub mod message;
pub mod queue;

pub use history::{ConversationState, HistoryStore, InMemoryHistory};
pub use message::{ContentPart, ConversationId, Location, Message, Role};
pub use queue::ConversationQueue;
