// src/services/task_service.rs

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::{task_repo::CompletionChange, CrmRepository, TaskRepository, UserRepository},
    models::task::{
        AttachmentResponse, CreateTaskPayload, Task, TaskAttachment, TaskFilter, TaskStatus,
        UpdateTaskPayload,
    },
};

/// Public prefix the upload directory is served under.
pub const UPLOAD_URL_PREFIX: &str = "/uploads/tasks";

/// `completed_at` follows the requested status: completing stamps the call's
/// single timestamp, leaving `completed` clears it, no status keeps it.
pub fn completion_change(next: Option<TaskStatus>, now: DateTime<Utc>) -> CompletionChange {
    match next {
        None => CompletionChange::Keep,
        Some(TaskStatus::Completed) => CompletionChange::Set(now),
        Some(_) => CompletionChange::Clear,
    }
}

/// `<uuid>.<ext>`, the extension reduced to lowercase ASCII alphanumerics.
pub fn stored_file_name(id: Uuid, original_name: &str) -> String {
    let ext: String = std::path::Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();

    if ext.is_empty() {
        id.to_string()
    } else {
        format!("{}.{}", id, ext)
    }
}

pub fn attachment_url(stored_name: &str) -> String {
    format!("{}/{}", UPLOAD_URL_PREFIX, stored_name)
}

/// Best-effort removal of stored uploads; returns how many files were deleted.
pub async fn remove_stored_files(dir: &Path, stored_names: &[String]) -> usize {
    let mut removed = 0;
    for name in stored_names {
        let path = dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove attachment file"),
        }
    }
    removed
}

fn can_see(task: &Task, user_id: Uuid, is_manager: bool) -> bool {
    is_manager || task.assigned_to == user_id || task.created_by == user_id
}

#[derive(Clone)]
pub struct TaskService {
    task_repo: TaskRepository,
    user_repo: UserRepository,
    crm_repo: CrmRepository,
    upload_dir: PathBuf,
}

impl TaskService {
    pub fn new(
        task_repo: TaskRepository,
        user_repo: UserRepository,
        crm_repo: CrmRepository,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            task_repo,
            user_repo,
            crm_repo,
            upload_dir,
        }
    }

    async fn ensure_refs(&self, assignee: Option<Uuid>, customer: Option<Uuid>) -> Result<(), AppError> {
        if let Some(id) = assignee {
            if !self.user_repo.exists(id).await? {
                return Err(AppError::ResourceNotFound(Resource::User));
            }
        }
        if let Some(id) = customer {
            if !self.crm_repo.customer_exists(self.crm_repo.pool(), id).await? {
                return Err(AppError::ResourceNotFound(Resource::Customer));
            }
        }
        Ok(())
    }

    pub async fn list_tasks(
        &self,
        user_id: Uuid,
        is_manager: bool,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, AppError> {
        let visible_to = if is_manager { None } else { Some(user_id) };
        self.task_repo.list_tasks(visible_to, filter).await
    }

    /// Tasks outside the caller's reach read as missing.
    pub async fn get_task(&self, id: Uuid, user_id: Uuid, is_manager: bool) -> Result<Task, AppError> {
        self.task_repo
            .find_task(id)
            .await?
            .filter(|task| can_see(task, user_id, is_manager))
            .ok_or(AppError::ResourceNotFound(Resource::Task))
    }

    pub async fn create_task(&self, actor_id: Uuid, input: &CreateTaskPayload) -> Result<Task, AppError> {
        self.ensure_refs(input.assigned_to, input.customer_id).await?;
        let assignee = input.assigned_to.unwrap_or(actor_id);

        let task = self.task_repo.create_task(input, assignee, actor_id).await?;
        tracing::info!(task_id = %task.id, assigned_to = %assignee, "task created");
        Ok(task)
    }

    pub async fn update_task(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_manager: bool,
        input: &UpdateTaskPayload,
    ) -> Result<Task, AppError> {
        self.get_task(id, user_id, is_manager).await?;
        self.ensure_refs(input.assigned_to, input.customer_id).await?;

        let completion = completion_change(input.status, Utc::now());
        self.task_repo
            .update_task(id, input, completion)
            .await?
            .ok_or(AppError::ResourceNotFound(Resource::Task))
    }

    /// Only the creator or a manager may delete.
    pub async fn delete_task(&self, id: Uuid, user_id: Uuid, is_manager: bool) -> Result<(), AppError> {
        let task = self.get_task(id, user_id, is_manager).await?;
        if !is_manager && task.created_by != user_id {
            return Err(AppError::Forbidden);
        }
        // Rows cascade with the task; the files are ours to clean up
        let stored: Vec<String> = self
            .task_repo
            .list_attachments(id)
            .await?
            .into_iter()
            .map(|a| a.stored_name)
            .collect();

        if self.task_repo.delete_task(id).await? {
            let removed = remove_stored_files(&self.upload_dir, &stored).await;
            tracing::info!(task_id = %id, removed, "task deleted");
        }
        Ok(())
    }

    // =========================================================================
    //  ATTACHMENTS
    // =========================================================================

    pub async fn list_attachments(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        is_manager: bool,
    ) -> Result<Vec<AttachmentResponse>, AppError> {
        self.get_task(task_id, user_id, is_manager).await?;
        let attachments = self.task_repo.list_attachments(task_id).await?;
        Ok(attachments.into_iter().map(to_response).collect())
    }

    pub async fn save_attachment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        is_manager: bool,
        original_name: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<AttachmentResponse, AppError> {
        self.get_task(task_id, user_id, is_manager).await?;

        if bytes.is_empty() {
            return Err(AppError::BadRequest("missing_file"));
        }

        let original_name = original_name.trim();
        if original_name.is_empty() {
            return Err(AppError::InvalidUpload("empty file name".into()));
        }

        let stored_name = stored_file_name(Uuid::new_v4(), original_name);
        let path = self.upload_dir.join(&stored_name);

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(&path, bytes).await?;

        let attachment = self
            .task_repo
            .add_attachment(
                task_id,
                original_name,
                &stored_name,
                mime_type,
                bytes.len() as i64,
                user_id,
            )
            .await;

        match attachment {
            Ok(attachment) => {
                tracing::info!(%task_id, stored_name = %attachment.stored_name, size = bytes.len(), "attachment stored");
                Ok(to_response(attachment))
            }
            Err(e) => {
                // Don't leave orphaned files behind
                if let Err(io_err) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %io_err, "could not remove orphaned upload");
                }
                Err(e)
            }
        }
    }
}

fn to_response(attachment: TaskAttachment) -> AttachmentResponse {
    let url = attachment_url(&attachment.stored_name);
    AttachmentResponse { attachment, url }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deleting_files_skips_missing_ones() {
        let dir = std::env::temp_dir().join(format!("cem-uploads-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("a.pdf"), b"%PDF").await.unwrap();
        tokio::fs::write(dir.join("b.png"), b"png").await.unwrap();

        let names = vec!["a.pdf".to_string(), "gone.txt".to_string(), "b.png".to_string()];
        assert_eq!(remove_stored_files(&dir, &names).await, 2);
        assert!(!dir.join("a.pdf").exists());
        assert!(!dir.join("b.png").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn completing_stamps_the_given_instant() {
        let now = Utc::now();
        assert_eq!(
            completion_change(Some(TaskStatus::Completed), now),
            CompletionChange::Set(now)
        );
    }

    #[test]
    fn leaving_completed_clears_and_no_status_keeps() {
        let now = Utc::now();
        assert_eq!(
            completion_change(Some(TaskStatus::InProgress), now),
            CompletionChange::Clear
        );
        assert_eq!(
            completion_change(Some(TaskStatus::Cancelled), now),
            CompletionChange::Clear
        );
        assert_eq!(completion_change(None, now), CompletionChange::Keep);
    }

    #[test]
    fn stored_names_keep_a_clean_extension() {
        let id = Uuid::nil();
        assert_eq!(
            stored_file_name(id, "قرارداد نهایی.PDF"),
            "00000000-0000-0000-0000-000000000000.pdf"
        );
        assert_eq!(
            stored_file_name(id, "../../etc/passwd"),
            "00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            stored_file_name(id, "archive.t@r"),
            "00000000-0000-0000-0000-000000000000.tr"
        );
    }

    #[test]
    fn urls_point_at_the_static_mount() {
        assert_eq!(attachment_url("a.png"), "/uploads/tasks/a.png");
    }
}
