// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

// A user row from the database
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    #[schema(example = "سارا احمدی")]
    pub name: String,

    #[schema(example = "sara@example.com")]
    pub email: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    /// Free text, matched against the access policy allowlists.
    #[schema(example = "sales_agent")]
    pub role: String,

    pub status: UserStatus,

    #[schema(example = "فروش تهران")]
    pub team: Option<String>,

    #[schema(example = "09121234567")]
    pub phone: Option<String>,

    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "sara@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub name: Option<String>,

    #[validate(length(min = 7, max = 20, message = "invalid_phone"))]
    pub phone: Option<String>,

    pub current_password: Option<String>,

    #[validate(length(min = 6, message = "min_length_6"))]
    pub new_password: Option<String>,
}

// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,    // user id
    pub role: String, // role at issue time, informational only
    pub exp: usize,
    pub iat: usize,
}
