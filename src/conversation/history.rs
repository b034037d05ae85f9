//! Conversation history storage and snapshot persistence.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::conversation::message::{ConversationId, Message, Role};
use crate::observability::metrics;

/// Ordered, length-capped history of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: ConversationId,
    messages: VecDeque<Message>,
}

impl ConversationState {
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            messages: VecDeque::new(),
        }
    }

    /// Append and evict the oldest entries beyond `max_messages`.
    pub fn push(&mut self, message: Message, max_messages: usize) {
        self.messages.push_back(message);
        while self.messages.len() > max_messages.max(1) {
            self.messages.pop_front();
        }
    }

    pub fn last_role(&self) -> Option<Role> {
        self.messages.back().map(|m| m.role)
    }

    /// A response is owed when the newest entry exists and came from the user side.
    pub fn is_due(&self) -> bool {
        matches!(self.last_role(), Some(Role::User))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

/// Per-conversation message log consulted by the scheduler.
pub trait HistoryStore: Send + Sync {
    /// Append a message, creating the conversation on first use.
    fn append(&self, id: &ConversationId, message: Message);

    /// Role of the newest entry, `None` for unknown or empty conversations.
    fn last_role(&self, id: &ConversationId) -> Option<Role>;

    /// Chronological copy of the stored messages.
    fn messages(&self, id: &ConversationId) -> Vec<Message>;

    /// Number of stored messages for one conversation.
    fn len(&self, id: &ConversationId) -> usize;

    /// Ids of every stored conversation.
    fn conversation_ids(&self) -> Vec<ConversationId>;

    fn is_due(&self, id: &ConversationId) -> bool {
        matches!(self.last_role(id), Some(Role::User))
    }
}

/// A thread-safe in-memory history store.
#[derive(Clone)]
pub struct InMemoryHistory {
    inner: Arc<DashMap<ConversationId, ConversationState>>,
    max_messages: usize,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryHistory {
    pub fn new(max_messages: usize, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_messages,
            snapshot_path,
        }
    }

    /// Create a store and fill it from the snapshot file if it exists.
    pub fn load_from_file(max_messages: usize, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let store = Self::new(max_messages, Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: HashMap<ConversationId, ConversationState> = serde_json::from_reader(reader)?;

            for (id, mut state) in map {
                // Re-apply the cap in case it shrank since the snapshot was taken.
                while state.messages.len() > max_messages.max(1) {
                    state.messages.pop_front();
                }
                store.inner.insert(id, state);
            }
            metrics::record_conversations(store.inner.len());
            tracing::info!(
                path = %path.display(),
                conversations = store.inner.len(),
                "Loaded conversation history snapshot"
            );
        }
        Ok(store)
    }

    /// Write every conversation to the snapshot file, if one is configured.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.snapshot_path {
            let writer = BufWriter::new(File::create(path)?);
            let map: HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();

            serde_json::to_writer(writer, &map)?;
            tracing::info!(
                path = %path.display(),
                conversations = map.len(),
                "Saved conversation history snapshot"
            );
        }
        Ok(())
    }

    pub fn conversation_count(&self) -> usize {
        self.inner.len()
    }
}

impl HistoryStore for InMemoryHistory {
    fn append(&self, id: &ConversationId, message: Message) {
        let mut entry = self
            .inner
            .entry(id.clone())
            .or_insert_with(|| ConversationState::new(id.clone()));
        entry.push(message, self.max_messages);
        drop(entry);
        metrics::record_conversations(self.inner.len());
    }

    fn last_role(&self, id: &ConversationId) -> Option<Role> {
        self.inner.get(id).and_then(|state| state.last_role())
    }

    fn messages(&self, id: &ConversationId) -> Vec<Message> {
        self.inner
            .get(id)
            .map(|state| state.messages().cloned().collect())
            .unwrap_or_default()
    }

    fn len(&self, id: &ConversationId) -> usize {
        self.inner.get(id).map(|state| state.len()).unwrap_or(0)
    }

    fn conversation_ids(&self) -> Vec<ConversationId> {
        self.inner.iter().map(|r| r.key().clone()).collect()
    }
}
