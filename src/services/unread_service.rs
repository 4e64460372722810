use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppResult;

pub struct UnreadService;

impl UnreadService {
    /// Messages in one conversation the user has not read yet.
    pub async fn count_for(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint FROM messages
             WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    /// Global unread total across every conversation the user belongs to.
    /// Drives the badge counter.
    pub async fn total_for(db: &Pool<Postgres>, user_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::bigint
             FROM messages m
             JOIN conversations c ON m.conversation_id = c.id
             WHERE (c.buyer_id = $1 OR c.seller_id = $1)
               AND m.sender_id <> $1
               AND m.is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }
}
