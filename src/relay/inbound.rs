//! Inbound message handling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{ContentPart, ConversationId, ConversationQueue, Location, Message};
use crate::dispatch::{describe_or_placeholder, Enricher};
use crate::observability::metrics;

/// A chat message as received from the origin platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub conversation_id: ConversationId,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("message for {0} has neither text nor images")]
    EmptyMessage(ConversationId),

    #[error("conversation id must not be empty")]
    MissingConversation,
}

/// Ingest side of the relay: enrich, append, enqueue.
#[derive(Clone)]
pub struct Relay {
    queue: ConversationQueue,
    enricher: Arc<dyn Enricher>,
    placeholder: String,
}

impl Relay {
    pub fn new(queue: ConversationQueue, enricher: Arc<dyn Enricher>, placeholder: impl Into<String>) -> Self {
        Self {
            queue,
            enricher,
            placeholder: placeholder.into(),
        }
    }

    /// Convert, enrich and store one inbound message. The conversation becomes due.
    pub async fn ingest(&self, inbound: InboundMessage) -> Result<Message, RelayError> {
        if inbound.conversation_id.as_str().trim().is_empty() {
            return Err(RelayError::MissingConversation);
        }

        let text = inbound
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if text.is_none() && inbound.image_urls.is_empty() {
            return Err(RelayError::EmptyMessage(inbound.conversation_id));
        }

        let mut parts = Vec::with_capacity(1 + inbound.image_urls.len());
        if let Some(text) = text {
            parts.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        for url in &inbound.image_urls {
            let description =
                describe_or_placeholder(self.enricher.as_ref(), url, &self.placeholder).await;
            parts.push(ContentPart::ImageDescription { description });
        }

        let message = Message::user(inbound.user_id, inbound.display_name, parts)
            .with_location(inbound.location);
        self.queue
            .add_message(&inbound.conversation_id, message.clone());
        metrics::record_inbound_message();

        tracing::debug!(
            conversation_id = %inbound.conversation_id,
            parts = message.parts.len(),
            "Inbound message queued"
        );
        Ok(message)
    }

    pub fn queue(&self) -> &ConversationQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{HistoryStore, InMemoryHistory, Role};
    use crate::dispatch::EnrichError;
    use async_trait::async_trait;

    struct Captioner;

    #[async_trait]
    impl Enricher for Captioner {
        async fn describe_image(&self, image_url: &str) -> Result<String, EnrichError> {
            if image_url.contains("broken") {
                Err(EnrichError::Empty)
            } else {
                Ok(format!("photo at {image_url}"))
            }
        }
    }

    fn relay() -> Relay {
        let history = Arc::new(InMemoryHistory::new(10, None));
        Relay::new(ConversationQueue::new(history), Arc::new(Captioner), "[unreadable image]")
    }

    fn inbound(text: Option<&str>, images: &[&str]) -> InboundMessage {
        InboundMessage {
            conversation_id: ConversationId::from("chat-1"),
            user_id: "u1".into(),
            display_name: "Ada".into(),
            location: None,
            text: text.map(str::to_string),
            image_urls: images.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_text_and_images_are_enriched() {
        let relay = relay();
        let msg = relay
            .ingest(inbound(Some(" hello "), &["http://a/1.jpg", "http://a/broken.jpg"]))
            .await
            .unwrap();

        assert_eq!(
            msg.parts,
            vec![
                ContentPart::Text { text: "hello".into() },
                ContentPart::ImageDescription {
                    description: "photo at http://a/1.jpg".into()
                },
                ContentPart::ImageDescription {
                    description: "[unreadable image]".into()
                },
            ]
        );

        let id = ConversationId::from("chat-1");
        assert_eq!(relay.queue().all_chats(), vec![id.clone()]);
        assert_eq!(relay.queue().history().last_role(&id), Some(Role::User));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let relay = relay();
        let err = relay.ingest(inbound(Some("   "), &[])).await.unwrap_err();
        assert_eq!(err, RelayError::EmptyMessage(ConversationId::from("chat-1")));
        assert!(relay.queue().is_empty());
    }

    #[tokio::test]
    async fn test_missing_conversation_rejected() {
        let relay = relay();
        let mut msg = inbound(Some("hi"), &[]);
        msg.conversation_id = ConversationId::from("");
        assert_eq!(relay.ingest(msg).await.unwrap_err(), RelayError::MissingConversation);
    }
}
