// src/db/task_repo.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::task::{
        CreateTaskPayload, Task, TaskAttachment, TaskFilter, TaskPriority, UpdateTaskPayload,
    },
};

/// How `completed_at` changes with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionChange {
    Keep,
    Set(DateTime<Utc>),
    Clear,
}

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `visible_to = None` lists every task (managers).
    pub async fn list_tasks(
        &self,
        visible_to: Option<Uuid>,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT * FROM tasks
            WHERE ($1::uuid IS NULL OR assigned_to = $1 OR created_by = $1)
              AND ($2::task_status IS NULL OR status = $2)
            ORDER BY due_date ASC NULLS LAST, created_at DESC
            "#,
        )
        .bind(visible_to)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    pub async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    pub async fn create_task(
        &self,
        input: &CreateTaskPayload,
        assigned_to: Uuid,
        created_by: Uuid,
    ) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, customer_id, assigned_to, created_by, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(input.title.trim())
        .bind(input.description.as_deref())
        .bind(input.customer_id)
        .bind(assigned_to)
        .bind(created_by)
        .bind(input.priority.unwrap_or(TaskPriority::Medium))
        .bind(input.due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    pub async fn update_task(
        &self,
        id: Uuid,
        input: &UpdateTaskPayload,
        completion: CompletionChange,
    ) -> Result<Option<Task>, AppError> {
        // $9 selects the branch: 0 keep, 1 set to $10, 2 clear
        let (mode, stamp): (i16, Option<DateTime<Utc>>) = match completion {
            CompletionChange::Keep => (0, None),
            CompletionChange::Set(at) => (1, Some(at)),
            CompletionChange::Clear => (2, None),
        };

        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                customer_id = COALESCE($4, customer_id),
                assigned_to = COALESCE($5, assigned_to),
                priority = COALESCE($6, priority),
                status = COALESCE($7, status),
                due_date = COALESCE($8, due_date),
                completed_at = CASE $9::smallint
                    WHEN 1 THEN $10::timestamptz
                    WHEN 2 THEN NULL
                    ELSE completed_at
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.description.as_deref())
        .bind(input.customer_id)
        .bind(input.assigned_to)
        .bind(input.priority)
        .bind(input.status)
        .bind(input.due_date)
        .bind(mode)
        .bind(stamp)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  ATTACHMENTS
    // =========================================================================

    pub async fn add_attachment(
        &self,
        task_id: Uuid,
        original_name: &str,
        stored_name: &str,
        mime_type: Option<&str>,
        size_bytes: i64,
        uploaded_by: Uuid,
    ) -> Result<TaskAttachment, AppError> {
        let attachment = sqlx::query_as::<_, TaskAttachment>(
            r#"
            INSERT INTO task_attachments (task_id, original_name, stored_name, mime_type, size_bytes, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(original_name)
        .bind(stored_name)
        .bind(mime_type)
        .bind(size_bytes)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(attachment)
    }

    pub async fn list_attachments(&self, task_id: Uuid) -> Result<Vec<TaskAttachment>, AppError> {
        let attachments = sqlx::query_as::<_, TaskAttachment>(
            "SELECT * FROM task_attachments WHERE task_id = $1 ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attachments)
    }
}
