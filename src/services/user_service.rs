// src/services/user_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::UserRepository,
    models::{
        auth::{User, UserStatus},
        user::{CreateUserPayload, DirectoryEntry, UpdateUserPayload},
    },
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    pool: PgPool,
}

impl UserService {
    pub fn new(user_repo: UserRepository, pool: PgPool) -> Self {
        Self { user_repo, pool }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list_users().await
    }

    pub async fn directory(&self) -> Result<Vec<DirectoryEntry>, AppError> {
        self.user_repo.directory().await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::User))
    }

    pub async fn create_user(&self, input: &CreateUserPayload) -> Result<User, AppError> {
        // 1. Cheap check first; the unique index still guards the race
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        // 2. Hash outside any transaction
        let hashed = hash_password(&input.password).await?;

        // 3. Insert
        let user = self
            .user_repo
            .create_user(
                &self.pool,
                &input.name,
                &input.email,
                &hashed,
                &input.role,
                input.team.as_deref(),
                input.phone.as_deref(),
            )
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    /// `full_edit` is false when users edit their own record: only name and phone apply.
    pub async fn update_user(
        &self,
        id: Uuid,
        input: UpdateUserPayload,
        full_edit: bool,
    ) -> Result<User, AppError> {
        let input = if full_edit {
            input
        } else {
            UpdateUserPayload {
                name: input.name,
                phone: input.phone,
                ..Default::default()
            }
        };

        self.user_repo
            .update_user(id, &input)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::User))
    }

    pub async fn set_status(
        &self,
        actor_id: Uuid,
        id: Uuid,
        status: UserStatus,
    ) -> Result<User, AppError> {
        if actor_id == id {
            return Err(AppError::BadRequest("cannot_change_own_status"));
        }

        let user = self
            .user_repo
            .set_status(id, status)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::User))?;

        tracing::info!(user_id = %id, ?status, "user status changed");
        Ok(user)
    }
}
