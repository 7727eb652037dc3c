// src/handlers/permissions.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{envelope::Envelope, error::ApiError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, rbac::RequireManager},
    models::module::{
        NavigationResponse, PermissionChange, PermissionWriteOutcome, PermissionWritePayload,
        ResolvedModules, UserModuleGrants,
    },
};

// GET /api/modules
#[utoipa::path(
    get,
    path = "/api/modules",
    tag = "Permissions",
    responses((status = 200, description = "Active module catalog; fallback=true when served from the built-in list", body = ResolvedModules)),
    security(("api_jwt" = []))
)]
pub async fn list_modules(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let (modules, fallback) = app_state.permission_service.catalog().await;
    Json(Envelope::ok(ResolvedModules { modules, fallback }))
}

// GET /api/permissions/me
#[utoipa::path(
    get,
    path = "/api/permissions/me",
    tag = "Permissions",
    responses((status = 200, description = "Modules the caller may open, grouped for the sidebar", body = NavigationResponse)),
    security(("api_jwt" = []))
)]
pub async fn my_modules(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> impl IntoResponse {
    let navigation = app_state
        .permission_service
        .navigation_for(user.id, &user.role)
        .await;

    Json(Envelope::ok(navigation))
}

// GET /api/permissions/users/{id}
#[utoipa::path(
    get,
    path = "/api/permissions/users/{id}",
    tag = "Permissions",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "One row per catalog module", body = UserModuleGrants),
        (status = 403, description = "Caller is not a manager"),
        (status = 404, description = "User not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn user_grants(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireManager,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let grants = app_state
        .permission_service
        .grants_for_user(id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(grants)))
}

// POST /api/permissions
// Body is either one change or `{ "changes": [...] }`
#[utoipa::path(
    post,
    path = "/api/permissions",
    tag = "Permissions",
    request_body = PermissionChange,
    responses(
        (status = 200, description = "Changes applied together; persisted=false when the permissions table is missing", body = PermissionWriteOutcome),
        (status = 403, description = "Caller is not a manager"),
        (status = 404, description = "User or module not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_permissions(
    State(app_state): State<AppState>,
    locale: Locale,
    manager: RequireManager,
    Json(payload): Json<PermissionWritePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = payload.into_changes();

    let outcome = app_state
        .permission_service
        .set_permissions(&changes)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    tracing::info!(
        actor = %manager.user.id,
        applied = outcome.applied,
        persisted = outcome.persisted,
        "permission write"
    );

    let key = if outcome.persisted {
        "success.permission_saved"
    } else {
        "success.permission_skipped"
    };

    Ok(Json(
        Envelope::ok(outcome).with_message(app_state.i18n_store.t(&locale, key)),
    ))
}
