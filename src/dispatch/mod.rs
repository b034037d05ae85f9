//! Collaborator boundary.
//!
//! # Data Flow
//! ```text
//! Scheduler attempt:
//!     → DeliveryChannel::send_typing
//!     → ResponseDispatcher::generate_response (history snapshot in, Reply out)
//!     → DeliveryChannel::send_image / send_text
//!
//! Inbound message (relay):
//!     → Enricher::describe_image (failure → placeholder, never an error)
//! ```
//!
//! # Design Decisions
//! - Collaborators are injected trait objects; the scheduler never knows the transport
//! - Every failure is classified into a `DispatchError` where it is raised, so
//!   callers match on `ErrorKind` instead of inspecting messages
//! - HTTP implementations live in http.rs and enrichment.rs

pub mod enrichment;
pub mod error;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationId, Message};

pub use enrichment::{describe_or_placeholder, Enricher, EnrichError, HttpEnricher};
pub use error::{DispatchError, DispatchResult, ErrorKind};
pub use http::{HttpDelivery, HttpDispatcher};

/// A generated reply for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }
}

/// Produces replies for conversations.
#[async_trait]
pub trait ResponseDispatcher: Send + Sync {
    /// Generate a reply. `Ok(None)` means there is nothing to send.
    async fn generate_response(
        &self,
        conversation: &ConversationId,
        history: &[Message],
    ) -> DispatchResult<Option<Reply>>;
}

/// Sends things back to the origin chat.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send_typing(&self, conversation: &ConversationId) -> DispatchResult<()>;
    async fn send_image(&self, conversation: &ConversationId, url: &str) -> DispatchResult<()>;
    async fn send_text(&self, conversation: &ConversationId, text: &str) -> DispatchResult<()>;
}
