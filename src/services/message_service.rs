use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Message, MessageContent};
use crate::realtime::{ChangeEvent, RealtimeBus, Topic};
use crate::services::block_service::BlockService;
use crate::services::conversation_service::ConversationService;

pub struct MessageService;

impl MessageService {
    /// Append a message to a conversation. The sender must be a
    /// participant and the pair must not be blocked in either direction.
    /// Content is stored opaquely; attachment URLs are never
    /// reinterpreted here.
    pub async fn append(
        db: &Pool<Postgres>,
        bus: &RealtimeBus,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: MessageContent,
    ) -> AppResult<Message> {
        if let MessageContent::Text { body } = &content {
            if body.trim().is_empty() {
                return Err(AppError::InvalidOperation(
                    "message content cannot be empty".into(),
                ));
            }
        }

        let (buyer_id, seller_id) = ConversationService::participants(db, conversation_id).await?;
        if sender_id != buyer_id && sender_id != seller_id {
            return Err(AppError::Forbidden);
        }
        let recipient_id = if sender_id == buyer_id { seller_id } else { buyer_id };

        let status = BlockService::is_blocked(db, sender_id, recipient_id).await?;
        if status.blocked {
            return Err(AppError::Forbidden);
        }

        let id = Uuid::new_v4();
        let (message_type, body, file_name) = content.columns();

        let mut tx = db.begin().await?;
        let row = sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, message_type, content, file_name)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING created_at",
        )
        .bind(id)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(message_type)
        .bind(body)
        .bind(file_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("failed to insert message: {}", e);
            AppError::from(e)
        })?;
        let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

        sqlx::query("UPDATE conversations SET last_message_at = $1 WHERE id = $2")
            .bind(created_at)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let event = ChangeEvent::MessageNew {
            conversation_id,
            message_id: id,
            sender_id,
        };
        bus.publish(Topic::Conversation(conversation_id), &event).await;
        // badge refresh for the recipient's other views
        bus.publish(Topic::User(recipient_id), &event).await;

        Ok(Message {
            id,
            conversation_id,
            sender_id,
            content,
            created_at,
            is_delivered: false,
            is_read: false,
        })
    }

    /// Full message history, ordered by (created_at, id) ascending. The id
    /// tiebreak keeps concurrent sends that share a timestamp stable.
    pub async fn list(db: &Pool<Postgres>, conversation_id: Uuid) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, sender_id, message_type, content, file_name,
                    created_at, is_delivered, is_read
             FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(db)
        .await?;

        Ok(rows.iter().map(Self::message_from_row).collect())
    }

    /// Bulk-remove every message in a conversation, keeping the thread
    /// itself. Participant-only.
    pub async fn clear(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        requester_id: Uuid,
    ) -> AppResult<u64> {
        if !ConversationService::is_participant(db, conversation_id, requester_id).await? {
            return Err(AppError::Forbidden);
        }

        let result = sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(db)
            .await
            .map_err(|e| {
                tracing::error!("failed to clear conversation {}: {}", conversation_id, e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected())
    }

    fn message_from_row(row: &sqlx::postgres::PgRow) -> Message {
        let message_type: String = row.get("message_type");
        let content: String = row.get("content");
        let file_name: Option<String> = row.get("file_name");
        Message {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            sender_id: row.get("sender_id"),
            content: MessageContent::from_columns(&message_type, content, file_name),
            created_at: row.get("created_at"),
            is_delivered: row.get("is_delivered"),
            is_read: row.get("is_read"),
        }
    }
}
