use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directional block row, owned and mutable only by blocker_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Result of the symmetric block query. blocker_id tells the caller which
/// side owns the row: their own block is reversible, the peer's is not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockStatus {
    pub blocked: bool,
    pub blocker_id: Option<Uuid>,
}

impl BlockStatus {
    pub fn clear() -> Self {
        Self {
            blocked: false,
            blocker_id: None,
        }
    }

    /// Whether `user_id` can lift the block themselves.
    pub fn reversible_by(&self, user_id: Uuid) -> bool {
        self.blocked && self.blocker_id == Some(user_id)
    }
}
