use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::realtime::{ChangeEvent, RealtimeBus, Topic};
use crate::services::conversation_service::ConversationService;

pub struct DeliveryService;

impl DeliveryService {
    /// Mark every message the reader received in this conversation as
    /// delivered and read, in one monotonic UPDATE. Idempotent: already
    /// read rows are untouched, and the flags never reverse. Rows
    /// appended concurrently after the UPDATE executes remain unread;
    /// the next open or reconcile tick picks them up.
    ///
    /// Delivery and read are deliberately one transition here: there is
    /// no independent delivery acknowledgment, the recipient opening the
    /// conversation is the only ack. Per-message state machine:
    /// Sent -> Delivered -> Read, terminal at Read.
    ///
    /// Emits one message.read event per updated row so each sender's view
    /// can flip its delivery indicator. Returns the number of rows
    /// updated.
    pub async fn mark_read(
        db: &Pool<Postgres>,
        bus: &RealtimeBus,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> AppResult<u64> {
        if !ConversationService::is_participant(db, conversation_id, reader_id).await? {
            return Err(AppError::Forbidden);
        }

        let rows = sqlx::query(
            "UPDATE messages
             SET is_read = TRUE, is_delivered = TRUE
             WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
             RETURNING id",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .fetch_all(db)
        .await
        .map_err(|e| {
            tracing::error!("failed to mark conversation {} read: {}", conversation_id, e);
            AppError::from(e)
        })?;

        for row in &rows {
            let message_id: Uuid = row.get("id");
            bus.publish(
                Topic::Conversation(conversation_id),
                &ChangeEvent::MessageRead {
                    conversation_id,
                    message_id,
                    reader_id,
                },
            )
            .await;
        }

        Ok(rows.len() as u64)
    }
}
