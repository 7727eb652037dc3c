// src/db/chat_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::chat::ChatMessage};

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Both directions between two users, oldest first.
    pub async fn conversation(&self, me: Uuid, other: Uuid) -> Result<Vec<ChatMessage>, AppError> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT * FROM chat_messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(me)
        .bind(other)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn insert_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        body: &str,
    ) -> Result<ChatMessage, AppError> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (sender_id, receiver_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    /// Marks everything `sender` sent to `receiver` as read; returns how many changed.
    pub async fn mark_read(&self, receiver: Uuid, sender: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chat_messages SET is_read = TRUE
            WHERE receiver_id = $1 AND sender_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(receiver)
        .bind(sender)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, receiver: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_messages WHERE receiver_id = $1 AND is_read = FALSE",
        )
        .bind(receiver)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
