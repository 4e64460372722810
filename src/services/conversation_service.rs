use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Conversation, ConversationSummary, MessageContent};
use crate::services::unread_service::UnreadService;

pub struct ConversationService;

impl ConversationService {
    /// Get or create the conversation between a buyer and a seller about
    /// one listing. Idempotent under concurrency: the unique constraint on
    /// (buyer_id, seller_id, listing_id) plus upsert-or-return semantics
    /// guarantee that racing first-contact attempts all observe the same
    /// row. The no-op DO UPDATE makes RETURNING yield the existing row on
    /// conflict instead of nothing.
    pub async fn get_or_create(
        db: &Pool<Postgres>,
        buyer_id: Uuid,
        seller_id: Uuid,
        listing_id: &str,
    ) -> AppResult<Conversation> {
        if buyer_id == seller_id {
            return Err(AppError::InvalidOperation(
                "cannot start a conversation with yourself".into(),
            ));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO conversations (id, buyer_id, seller_id, listing_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (buyer_id, seller_id, listing_id)
                DO UPDATE SET listing_id = EXCLUDED.listing_id
            RETURNING id, buyer_id, seller_id, listing_id, created_at, last_message_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(buyer_id)
        .bind(seller_id)
        .bind(listing_id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            tracing::error!("failed to get or create conversation: {}", e);
            AppError::from(e)
        })?;

        Ok(Self::conversation_from_row(&row))
    }

    pub async fn get(db: &Pool<Postgres>, conversation_id: Uuid) -> AppResult<Conversation> {
        let row = sqlx::query(
            "SELECT id, buyer_id, seller_id, listing_id, created_at, last_message_at
             FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;

        Ok(Self::conversation_from_row(&row))
    }

    /// All conversations where the user is buyer or seller, newest
    /// activity first (last message time, falling back to creation time
    /// for threads that have no messages yet). Unread counts are delegated
    /// to UnreadService per row.
    pub async fn list(db: &Pool<Postgres>, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.buyer_id, c.seller_id, c.listing_id,
                   COALESCE(c.last_message_at, c.created_at) AS last_activity,
                   (
                     SELECT m.message_type FROM messages m
                     WHERE m.conversation_id = c.id
                     ORDER BY m.created_at DESC, m.id DESC LIMIT 1
                   ) AS preview_type,
                   (
                     SELECT m.content FROM messages m
                     WHERE m.conversation_id = c.id
                     ORDER BY m.created_at DESC, m.id DESC LIMIT 1
                   ) AS preview_content,
                   (
                     SELECT m.file_name FROM messages m
                     WHERE m.conversation_id = c.id
                     ORDER BY m.created_at DESC, m.id DESC LIMIT 1
                   ) AS preview_file_name
            FROM conversations c
            WHERE c.buyer_id = $1 OR c.seller_id = $1
            ORDER BY COALESCE(c.last_message_at, c.created_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.get("id");
            let buyer_id: Uuid = row.get("buyer_id");
            let seller_id: Uuid = row.get("seller_id");
            let listing_id: String = row.get("listing_id");
            let last_activity: chrono::DateTime<chrono::Utc> = row.get("last_activity");
            let preview_type: Option<String> = row.get("preview_type");
            let preview_content: Option<String> = row.get("preview_content");
            let preview_file_name: Option<String> = row.get("preview_file_name");

            let preview = match (preview_type, preview_content) {
                (Some(kind), Some(content)) => {
                    Some(MessageContent::from_columns(&kind, content, preview_file_name).preview())
                }
                _ => None,
            };

            let unread_count = UnreadService::count_for(db, id, user_id).await?;

            summaries.push(ConversationSummary {
                id,
                peer_id: if buyer_id == user_id { seller_id } else { buyer_id },
                listing_id,
                preview,
                last_activity: last_activity.to_rfc3339(),
                unread_count,
            });
        }

        Ok(summaries)
    }

    /// Delete a conversation and, through the FK cascade, all of its
    /// messages. Participant-only; elevated (admin) deletion goes through
    /// the same path with authorization handled by the caller.
    pub async fn delete(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        requester_id: Uuid,
    ) -> AppResult<()> {
        let conversation = Self::get(db, conversation_id).await?;
        if !conversation.is_participant(requester_id) {
            return Err(AppError::Forbidden);
        }

        sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .execute(db)
            .await
            .map_err(|e| {
                tracing::error!("failed to delete conversation {}: {}", conversation_id, e);
                AppError::from(e)
            })?;

        Ok(())
    }

    /// Membership guard shared by the message store, the delivery tracker
    /// and the realtime subscription scope.
    pub async fn is_participant(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let rec = sqlx::query(
            "SELECT 1 FROM conversations
             WHERE id = $1 AND (buyer_id = $2 OR seller_id = $2) LIMIT 1",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(rec.is_some())
    }

    /// Both participants of a conversation, or NotFound.
    pub async fn participants(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
    ) -> AppResult<(Uuid, Uuid)> {
        let row = sqlx::query("SELECT buyer_id, seller_id FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok((row.get("buyer_id"), row.get("seller_id")))
    }

    /// Whether two users are tied to at least one common conversation.
    /// Gates subscriptions to another user's presence channel.
    pub async fn share_conversation(
        db: &Pool<Postgres>,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(
                SELECT 1 FROM conversations
                WHERE (buyer_id = $1 AND seller_id = $2)
                   OR (buyer_id = $2 AND seller_id = $1)
             )",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(db)
        .await?;
        Ok(row.get::<bool, _>(0))
    }

    fn conversation_from_row(row: &sqlx::postgres::PgRow) -> Conversation {
        Conversation {
            id: row.get("id"),
            buyer_id: row.get("buyer_id"),
            seller_id: row.get("seller_id"),
            listing_id: row.get("listing_id"),
            created_at: row.get("created_at"),
            last_message_at: row.get("last_message_at"),
        }
    }
}
