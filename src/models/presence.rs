use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's believed online state. Not authoritative on its own: consumers
/// must also check last_seen_at against the staleness window, since an
/// ungraceful disconnect leaves a stale online row behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: Uuid,
    pub is_online: bool,
    pub last_seen_at: DateTime<Utc>,
}
