//! Set of conversations that have seen inbound activity.

use std::sync::Arc;

use dashmap::DashSet;

use crate::conversation::history::HistoryStore;
use crate::conversation::message::{ConversationId, Message};

/// Tracks every conversation id seen since startup.
///
/// Ids are never evicted; only the underlying history is trimmed. Whether a
/// conversation actually needs a reply is decided against the history store.
#[derive(Clone)]
pub struct ConversationQueue {
    known: Arc<DashSet<ConversationId>>,
    history: Arc<dyn HistoryStore>,
}

impl ConversationQueue {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            known: Arc::new(DashSet::new()),
            history,
        }
    }

    /// Seed the queue with conversations restored from a snapshot.
    pub fn with_known(history: Arc<dyn HistoryStore>, ids: impl IntoIterator<Item = ConversationId>) -> Self {
        let queue = Self::new(history);
        for id in ids {
            queue.known.insert(id);
        }
        queue
    }

    /// Append the message to the conversation's history and mark it as known.
    pub fn add_message(&self, id: &ConversationId, message: Message) {
        self.history.append(id, message);
        self.known.insert(id.clone());
    }

    /// Snapshot of every known conversation id.
    pub fn all_chats(&self) -> Vec<ConversationId> {
        self.known.iter().map(|r| r.key().clone()).collect()
    }

    pub fn is_due(&self, id: &ConversationId) -> bool {
        self.history.is_due(id)
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
