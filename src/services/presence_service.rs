use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::PresenceRecord;
use crate::realtime::{ChangeEvent, RealtimeBus, Topic};

/// Staleness check, separated out so consumers and tests share one
/// definition: a row only counts as online while its heartbeat is fresh.
pub fn presence_is_fresh(record: &PresenceRecord, now: DateTime<Utc>, window: Duration) -> bool {
    record.is_online && now - record.last_seen_at < window
}

pub struct PresenceService;

impl PresenceService {
    /// Upsert the caller's presence row with last_seen_at = now. Multiple
    /// sessions of one user may race; last write by timestamp wins, which
    /// is the intended resolution. Publishes presence.updated on the
    /// user's channel for anyone viewing a conversation with them.
    pub async fn heartbeat(
        db: &Pool<Postgres>,
        bus: &RealtimeBus,
        user_id: Uuid,
        is_online: bool,
    ) -> AppResult<PresenceRecord> {
        let row = sqlx::query(
            "INSERT INTO presence (user_id, is_online, last_seen_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (user_id)
                DO UPDATE SET is_online = EXCLUDED.is_online, last_seen_at = NOW()
             RETURNING user_id, is_online, last_seen_at",
        )
        .bind(user_id)
        .bind(is_online)
        .fetch_one(db)
        .await
        .map_err(|e| {
            tracing::error!("failed to record heartbeat for {}: {}", user_id, e);
            AppError::from(e)
        })?;

        let record = PresenceRecord {
            user_id: row.get("user_id"),
            is_online: row.get("is_online"),
            last_seen_at: row.get("last_seen_at"),
        };

        bus.publish(
            Topic::User(user_id),
            &ChangeEvent::PresenceUpdated {
                user_id,
                is_online: record.is_online,
                last_seen_at: record.last_seen_at,
            },
        )
        .await;

        Ok(record)
    }

    pub async fn get(db: &Pool<Postgres>, user_id: Uuid) -> AppResult<Option<PresenceRecord>> {
        let row = sqlx::query(
            "SELECT user_id, is_online, last_seen_at FROM presence WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;

        Ok(row.map(|r| PresenceRecord {
            user_id: r.get("user_id"),
            is_online: r.get("is_online"),
            last_seen_at: r.get("last_seen_at"),
        }))
    }

    /// Whether the user currently reads as online: the stored flag AND a
    /// heartbeat within the staleness window. An ungraceful disconnect
    /// leaves is_online = true behind, so the window does the real work.
    pub async fn is_online(
        db: &Pool<Postgres>,
        user_id: Uuid,
        staleness_window: Duration,
    ) -> AppResult<bool> {
        match Self::get(db, user_id).await? {
            Some(record) => Ok(presence_is_fresh(&record, Utc::now(), staleness_window)),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(is_online: bool, seconds_ago: i64) -> PresenceRecord {
        PresenceRecord {
            user_id: Uuid::new_v4(),
            is_online,
            last_seen_at: Utc::now() - Duration::seconds(seconds_ago),
        }
    }

    #[test]
    fn fresh_heartbeat_reads_as_online() {
        let window = Duration::seconds(30);
        assert!(presence_is_fresh(&record(true, 5), Utc::now(), window));
    }

    #[test]
    fn stale_row_reads_as_offline_even_if_flagged_online() {
        let window = Duration::seconds(30);
        assert!(!presence_is_fresh(&record(true, 31), Utc::now(), window));
        assert!(!presence_is_fresh(&record(true, 3600), Utc::now(), window));
    }

    #[test]
    fn offline_flag_wins_over_recency() {
        let window = Duration::seconds(30);
        assert!(!presence_is_fresh(&record(false, 0), Utc::now(), window));
    }
}
