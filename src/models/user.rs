// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::UserStatus;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    #[schema(example = "علی رضایی")]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    #[schema(example = "ali@example.com")]
    pub email: String,

    #[validate(length(min = 6, message = "min_length_6"))]
    pub password: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "sales_agent")]
    pub role: String,

    pub team: Option<String>,

    #[validate(length(min = 7, max = 20, message = "invalid_phone"))]
    pub phone: Option<String>,
}

// Managers may set every field; users editing themselves only name and phone
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    pub role: Option<String>,

    pub team: Option<String>,

    #[validate(length(min = 7, max = 20, message = "invalid_phone"))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    pub status: UserStatus,
}

// Slim user card for pickers and chat
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub team: Option<String>,
}
