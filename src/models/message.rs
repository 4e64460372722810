use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message body: plain text, or an opaque attachment reference produced by
/// the external upload component. The store never reinterprets the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { body: String },
    Image { url: String },
    File { url: String, file_name: String },
}

impl MessageContent {
    pub fn text(body: impl Into<String>) -> Self {
        MessageContent::Text { body: body.into() }
    }

    /// Storage discriminator, persisted in the message_type column.
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } => "text",
            MessageContent::Image { .. } => "image",
            MessageContent::File { .. } => "file",
        }
    }

    /// (message_type, content, file_name) column values.
    pub fn columns(&self) -> (&'static str, &str, Option<&str>) {
        match self {
            MessageContent::Text { body } => ("text", body, None),
            MessageContent::Image { url } => ("image", url, None),
            MessageContent::File { url, file_name } => ("file", url, Some(file_name)),
        }
    }

    /// Rebuild the tagged value from its column representation. Unknown
    /// discriminators fall back to plain text so old rows stay readable.
    pub fn from_columns(kind: &str, content: String, file_name: Option<String>) -> Self {
        match kind {
            "image" => MessageContent::Image { url: content },
            "file" => MessageContent::File {
                url: content,
                file_name: file_name.unwrap_or_default(),
            },
            _ => MessageContent::Text { body: content },
        }
    }

    /// One-line preview for the conversation list.
    pub fn preview(&self) -> String {
        match self {
            MessageContent::Text { body } => body.clone(),
            MessageContent::Image { .. } => "[image]".to_string(),
            MessageContent::File { file_name, .. } => format!("[file] {file_name}"),
        }
    }
}

/// Immutable once created, except is_delivered / is_read which only ever
/// transition false -> true. Ordering key is (created_at, id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
    pub is_delivered: bool,
    pub is_read: bool,
}
