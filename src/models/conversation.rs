use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A durable two-party thread between a buyer and a seller, scoped to one
/// listing. Unique per (buyer_id, seller_id, listing_id); immutable except
/// for last_message_at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub listing_id: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// The other participant relative to `user_id`.
    pub fn peer_of(&self, user_id: Uuid) -> Uuid {
        if self.buyer_id == user_id {
            self.seller_id
        } else {
            self.buyer_id
        }
    }
}

/// One row of a user's conversation list: the thread plus the derived
/// fields the list screen renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub peer_id: Uuid,
    pub listing_id: String,
    /// Preview of the newest message, or None for an empty thread.
    pub preview: Option<String>,
    /// RFC 3339 timestamp of the latest activity (last message, falling
    /// back to creation time for empty threads).
    pub last_activity: String,
    pub unread_count: i64,
}
