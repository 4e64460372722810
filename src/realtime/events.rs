//! Change events fanned out to subscribers.
//!
//! Every event follows the "object.action" naming convention and carries
//! only the ids a subscriber needs to re-fetch the affected state. Events
//! are triggers, not authoritative payloads: duplicates and gaps are
//! expected, and the reconciliation poll is the backstop for both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChangeEvent {
    /// New message appended to a conversation.
    #[serde(rename = "message.new")]
    MessageNew {
        conversation_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
    },

    /// A message's flags moved to delivered+read. Emitted once per updated
    /// message so the sender's view can flip its delivery indicator.
    #[serde(rename = "message.read")]
    MessageRead {
        conversation_id: Uuid,
        message_id: Uuid,
        reader_id: Uuid,
    },

    /// Presence row upserted for a user.
    #[serde(rename = "presence.updated")]
    PresenceUpdated {
        user_id: Uuid,
        is_online: bool,
        last_seen_at: DateTime<Utc>,
    },

    /// Block relation created or removed between two users.
    #[serde(rename = "block.changed")]
    BlockChanged {
        blocker_id: Uuid,
        blocked_id: Uuid,
        blocked: bool,
    },
}

impl ChangeEvent {
    /// Event type as string (e.g., "message.new")
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageNew { .. } => "message.new",
            Self::MessageRead { .. } => "message.read",
            Self::PresenceUpdated { .. } => "presence.updated",
            Self::BlockChanged { .. } => "block.changed",
        }
    }

    /// JSON payload published on the wire.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("failed to serialize {} event: {}", self.event_type(), e);
            String::from("{}")
        })
    }

    pub fn from_payload(payload: &str) -> Option<Self> {
        serde_json::from_str(payload).ok()
    }
}
