// src/services/chat_service.rs

use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::{ChatRepository, UserRepository},
    models::chat::ChatMessage,
};

#[derive(Clone)]
pub struct ChatService {
    chat_repo: ChatRepository,
    user_repo: UserRepository,
}

impl ChatService {
    pub fn new(chat_repo: ChatRepository, user_repo: UserRepository) -> Self {
        Self { chat_repo, user_repo }
    }

    pub async fn conversation(&self, me: Uuid, other: Uuid) -> Result<Vec<ChatMessage>, AppError> {
        self.chat_repo.conversation(me, other).await
    }

    pub async fn send(&self, sender: Uuid, receiver: Uuid, body: &str) -> Result<ChatMessage, AppError> {
        if sender == receiver {
            return Err(AppError::BadRequest("cannot_message_self"));
        }
        if !self.user_repo.exists(receiver).await? {
            return Err(AppError::ResourceNotFound(Resource::User));
        }

        self.chat_repo.insert_message(sender, receiver, body.trim()).await
    }

    pub async fn mark_read(&self, me: Uuid, other: Uuid) -> Result<u64, AppError> {
        self.chat_repo.mark_read(me, other).await
    }

    pub async fn unread_count(&self, me: Uuid) -> Result<i64, AppError> {
        self.chat_repo.unread_count(me).await
    }
}
