//! Inbound relay subsystem.
//!
//! # Data Flow
//! ```text
//! POST /messages (http) or library caller
//!     → inbound.rs (validate, build content parts)
//!     → Enricher (image → description, placeholder on failure)
//!     → ConversationQueue::add_message (history append + id recorded)
//!     → picked up by the next processing cycle
//! ```
//!
//! # Design Decisions
//! - Enrichment runs synchronously before the message is stored
//! - Enrichment failures never become errors

pub mod inbound;

pub use inbound::{InboundMessage, Relay, RelayError};
