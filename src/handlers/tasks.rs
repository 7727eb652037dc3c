// src/handlers/tasks.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{envelope::Envelope, error::{ApiError, AppError}},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::task::{
        AttachmentResponse, CreateTaskPayload, Task, TaskFilter, UpdateTaskPayload,
    },
};

const FILE_FIELD: &str = "file";

// GET /api/tasks
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    params(("status" = Option<String>, Query, description = "pending | in_progress | completed | cancelled")),
    responses((status = 200, description = "Tasks visible to the caller", body = [Task])),
    security(("api_jwt" = []))
)]
pub async fn list_tasks(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<TaskFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let is_manager = app_state.policy.is_manager(&user.role);
    let tasks = app_state
        .task_service
        .list_tasks(user.id, is_manager, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(tasks)))
}

// POST /api/tasks
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = CreateTaskPayload,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 404, description = "Assignee or customer not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let task = app_state
        .task_service
        .create_task(user.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(task).with_message(app_state.i18n_store.t(&locale, "success.task_created"))),
    ))
}

// GET /api/tasks/{id}
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = Task),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let is_manager = app_state.policy.is_manager(&user.role);
    let task = app_state
        .task_service
        .get_task(id, user.id, is_manager)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(task)))
}

// PUT /api/tasks/{id}
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = UpdateTaskPayload,
    responses(
        (status = 200, description = "Task updated; completedAt follows the status", body = Task),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let is_manager = app_state.policy.is_manager(&user.role);
    let task = app_state
        .task_service
        .update_task(id, user.id, is_manager, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(task).with_message(app_state.i18n_store.t(&locale, "success.task_updated")),
    ))
}

// DELETE /api/tasks/{id}
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted"),
        (status = 403, description = "Neither a manager nor the creator"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_task(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let is_manager = app_state.policy.is_manager(&user.role);
    app_state
        .task_service
        .delete_task(id, user.id, is_manager)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::message(
        app_state.i18n_store.t(&locale, "success.task_deleted"),
    )))
}

// GET /api/tasks/{id}/attachments
#[utoipa::path(
    get,
    path = "/api/tasks/{id}/attachments",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Attachments with their public URL", body = [AttachmentResponse]),
        (status = 404, description = "Task not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_attachments(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let is_manager = app_state.policy.is_manager(&user.role);
    let attachments = app_state
        .task_service
        .list_attachments(id, user.id, is_manager)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(attachments)))
}

// POST /api/tasks/{id}/attachments (multipart, field "file")
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/attachments",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body(content_type = "multipart/form-data", description = "A single `file` field"),
    responses(
        (status = 201, description = "File stored", body = AttachmentResponse),
        (status = 400, description = "No file in the request"),
        (status = 404, description = "Task not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_attachment(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload_error =
        |e: axum::extract::multipart::MultipartError| AppError::InvalidUpload(e.body_text());

    // 1. Find the file field, skipping anything else the form carries
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e).to_api_error(&locale, app_state.i18n_store))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| upload_error(e).to_api_error(&locale, app_state.i18n_store))?;

        upload = Some((original_name, mime_type, bytes));
        break;
    }

    let Some((original_name, mime_type, bytes)) = upload else {
        return Err(AppError::BadRequest("missing_file").to_api_error(&locale, app_state.i18n_store));
    };

    // 2. Store it
    let is_manager = app_state.policy.is_manager(&user.role);
    let attachment = app_state
        .task_service
        .save_attachment(
            id,
            user.id,
            is_manager,
            &original_name,
            mime_type.as_deref(),
            &bytes,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(
            Envelope::ok(attachment)
                .with_message(app_state.i18n_store.t(&locale, "success.attachment_uploaded")),
        ),
    ))
}
