use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{BlockRecord, BlockStatus};
use crate::realtime::{ChangeEvent, RealtimeBus, Topic};

pub struct BlockService;

impl BlockService {
    /// Block a user. Idempotent: re-blocking is a no-op on the existing
    /// row. The unique pair constraint absorbs concurrent callers.
    pub async fn block(
        db: &Pool<Postgres>,
        bus: &RealtimeBus,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> AppResult<()> {
        if blocker_id == blocked_id {
            return Err(AppError::InvalidOperation("cannot block yourself".into()));
        }

        let result = sqlx::query(
            "INSERT INTO blocks (blocker_id, blocked_id, created_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (blocker_id, blocked_id) DO NOTHING",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(db)
        .await
        .map_err(|e| {
            tracing::error!("failed to block user: {}", e);
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            tracing::warn!("block already exists: {} -> {}", blocker_id, blocked_id);
        }

        Self::publish_change(bus, blocker_id, blocked_id, true).await;
        Ok(())
    }

    /// Remove exactly the directional row owned by blocker_id. A block in
    /// the opposite direction, if any, is untouched.
    pub async fn unblock(
        db: &Pool<Postgres>,
        bus: &RealtimeBus,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(db)
            .await
            .map_err(|e| {
                tracing::error!("failed to unblock user: {}", e);
                AppError::from(e)
            })?;

        Self::publish_change(bus, blocker_id, blocked_id, false).await;
        Ok(())
    }

    /// Symmetric query: a row in either direction means messaging is
    /// disabled both ways. blocker_id prefers user_a's own row when both
    /// directions exist, so the caller learns about the block they can
    /// actually lift.
    pub async fn is_blocked(
        db: &Pool<Postgres>,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<BlockStatus> {
        let row = sqlx::query(
            "SELECT blocker_id FROM blocks
             WHERE (blocker_id = $1 AND blocked_id = $2)
                OR (blocker_id = $2 AND blocked_id = $1)
             ORDER BY (blocker_id = $1) DESC
             LIMIT 1",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(db)
        .await?;

        Ok(match row {
            Some(r) => BlockStatus {
                blocked: true,
                blocker_id: Some(r.get("blocker_id")),
            },
            None => BlockStatus::clear(),
        })
    }

    /// The caller's own block list, newest first.
    pub async fn list_blocked(db: &Pool<Postgres>, blocker_id: Uuid) -> AppResult<Vec<BlockRecord>> {
        let rows = sqlx::query(
            "SELECT blocker_id, blocked_id, created_at FROM blocks
             WHERE blocker_id = $1 ORDER BY created_at DESC",
        )
        .bind(blocker_id)
        .fetch_all(db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BlockRecord {
                blocker_id: r.get("blocker_id"),
                blocked_id: r.get("blocked_id"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn publish_change(bus: &RealtimeBus, blocker_id: Uuid, blocked_id: Uuid, blocked: bool) {
        let event = ChangeEvent::BlockChanged {
            blocker_id,
            blocked_id,
            blocked,
        };
        bus.publish(Topic::User(blocker_id), &event).await;
        bus.publish(Topic::User(blocked_id), &event).await;
    }
}
