// src/models/chat.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,

    #[schema(example = "سلام، گزارش امروز آماده است؟")]
    pub body: String,

    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub receiver_id: Uuid,

    #[validate(length(min = 1, max = 4000, message = "invalid_length"))]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub with: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkReadPayload {
    pub with: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread: i64,
}
