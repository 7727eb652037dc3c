// src/handlers/chat.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{envelope::Envelope, error::{ApiError, AppError}},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::chat::{ChatMessage, ConversationQuery, MarkReadPayload, SendMessagePayload, UnreadCount},
};

// GET /api/messages?with={userId}
#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "Chat",
    params(("with" = uuid::Uuid, Query, description = "The other participant")),
    responses((status = 200, description = "Conversation, oldest first", body = [ChatMessage])),
    security(("api_jwt" = []))
)]
pub async fn conversation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = app_state
        .chat_service
        .conversation(user.id, query.with)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(messages)))
}

// POST /api/messages
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Chat",
    request_body = SendMessagePayload,
    responses(
        (status = 201, description = "Message sent", body = ChatMessage),
        (status = 400, description = "Empty body or message to oneself"),
        (status = 404, description = "Receiver not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let message = app_state
        .chat_service
        .send(user.id, payload.receiver_id, payload.body.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(message).with_message(app_state.i18n_store.t(&locale, "success.message_sent"))),
    ))
}

// POST /api/messages/read
#[utoipa::path(
    post,
    path = "/api/messages/read",
    tag = "Chat",
    request_body = MarkReadPayload,
    responses((status = 200, description = "Messages from that user marked as read")),
    security(("api_jwt" = []))
)]
pub async fn mark_read(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<MarkReadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .chat_service
        .mark_read(user.id, payload.with)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    tracing::debug!(user_id = %user.id, updated, "messages marked read");

    Ok(Json(Envelope::message(
        app_state.i18n_store.t(&locale, "success.messages_read"),
    )))
}

// GET /api/messages/unread
#[utoipa::path(
    get,
    path = "/api/messages/unread",
    tag = "Chat",
    responses((status = 200, description = "Unread messages addressed to the caller", body = UnreadCount)),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let unread = app_state
        .chat_service
        .unread_count(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(UnreadCount { unread })))
}
