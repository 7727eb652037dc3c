// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{envelope::Envelope, error::{ApiError, AppError}},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::RequireUserAdmin,
    },
    models::{
        auth::User,
        user::{CreateUserPayload, DirectoryEntry, UpdateStatusPayload, UpdateUserPayload},
    },
};

// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Caller is not a manager")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireUserAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let users = app_state
        .user_service
        .list_users()
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(users)))
}

// GET /api/users/directory
#[utoipa::path(
    get,
    path = "/api/users/directory",
    tag = "Users",
    responses((status = 200, description = "Active colleagues", body = [DirectoryEntry])),
    security(("api_jwt" = []))
)]
pub async fn directory(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state
        .user_service
        .directory()
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(entries)))
}

// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid data or email already registered"),
        (status = 403, description = "Caller is not a manager")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireUserAdmin,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let user = app_state
        .user_service
        .create_user(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(user).with_message(app_state.i18n_store.t(&locale, "success.user_created"))),
    ))
}

// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "Neither a manager nor the user"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if caller.id != id && !app_state.policy.can_manage_users(&caller.role) {
        return Err(AppError::Forbidden.to_api_error(&locale, app_state.i18n_store));
    }

    let user = app_state
        .user_service
        .get_user(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(user)))
}

// PUT /api/users/{id}
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Neither a manager nor the user"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let is_admin = app_state.policy.can_manage_users(&caller.role);
    if caller.id != id && !is_admin {
        return Err(AppError::Forbidden.to_api_error(&locale, app_state.i18n_store));
    }

    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    // Role and team changes need a manager, even on one's own record
    let user = app_state
        .user_service
        .update_user(id, payload, is_admin)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(user).with_message(app_state.i18n_store.t(&locale, "success.user_updated")),
    ))
}

// PATCH /api/users/{id}/status
#[utoipa::path(
    patch,
    path = "/api/users/{id}/status",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = User),
        (status = 400, description = "Own status cannot be changed"),
        (status = 403, description = "Caller is not a manager"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    admin: RequireUserAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .user_service
        .set_status(admin.user.id, id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(user).with_message(app_state.i18n_store.t(&locale, "success.status_updated")),
    ))
}
