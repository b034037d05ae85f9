//! Conversation and message types.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Identifier of one chat, as assigned by the origin platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Which side produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Response,
}

/// Geographic position attached to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// One typed piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Textual stand-in for an image, produced by the enrichment collaborator.
    ImageDescription { description: String },
}

impl ContentPart {
    pub fn text(&self) -> &str {
        match self {
            ContentPart::Text { text } => text,
            ContentPart::ImageDescription { description } => description,
        }
    }
}

/// A single history entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub user_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub parts: Vec<ContentPart>,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: u64,
}

impl Message {
    /// A user-side message stamped with the current time.
    pub fn user(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        parts: Vec<ContentPart>,
    ) -> Self {
        Self {
            role: Role::User,
            user_id: user_id.into(),
            display_name: display_name.into(),
            location: None,
            parts,
            created_at: unix_now(),
        }
    }

    /// A response-side message. `parts` is empty when the generator had nothing to say.
    pub fn response(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::Response,
            user_id: String::new(),
            display_name: String::new(),
            location: None,
            parts,
            created_at: unix_now(),
        }
    }

    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    /// All parts joined by newlines.
    pub fn plain_text(&self) -> String {
        self.parts
            .iter()
            .map(ContentPart::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
