// src/models/task.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    #[schema(example = "تماس پیگیری با مشتری")]
    pub title: String,

    pub description: Option<String>,
    pub customer_id: Option<Uuid>,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub title: String,

    pub description: Option<String>,
    pub customer_id: Option<Uuid>,

    /// Defaults to the caller.
    pub assigned_to: Option<Uuid>,

    pub priority: Option<TaskPriority>,

    #[schema(value_type = Option<String>, format = Date, example = "2026-10-20")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskPayload {
    #[validate(length(min = 2, message = "min_length_2"))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub customer_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,

    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskAttachment {
    pub id: Uuid,
    pub task_id: Uuid,

    #[schema(example = "قرارداد.pdf")]
    pub original_name: String,

    #[schema(example = "8f14e45f-ceea-4e7a-9d4b-2f5b1f0c7a11.pdf")]
    pub stored_name: String,

    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResponse {
    #[serde(flatten)]
    pub attachment: TaskAttachment,

    #[schema(example = "/uploads/tasks/8f14e45f-ceea-4e7a-9d4b-2f5b1f0c7a11.pdf")]
    pub url: String,
}
