// src/handlers/auth.rs

use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::Validate;

use crate::{
    common::{envelope::Envelope, error::{ApiError, AppError}},
    config::AppState,
    middleware::{
        auth::{AuthenticatedUser, AUTH_COOKIE},
        i18n::Locale,
    },
    models::auth::{AuthResponse, LoginUserPayload, UpdateProfilePayload, User},
};

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Logged in; token also set as the auth-token cookie", body = AuthResponse),
        (status = 401, description = "Wrong email or password"),
        (status = 403, description = "Account inactive or suspended")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    jar: CookieJar,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let (token, user) = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.settings.cookie_secure);

    let body = Envelope::ok(AuthResponse { token, user })
        .with_message(app_state.i18n_store.t(&locale, "success.logged_in"));

    Ok((jar.add(cookie), Json(body)))
}

// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Cookie cleared"))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    locale: Locale,
    jar: CookieJar,
) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    let body = Envelope::message(app_state.i18n_store.t(&locale, "success.logged_out"));
    (jar, Json(body))
}

// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<Envelope<User>> {
    Json(Envelope::ok(user))
}

// PUT /api/auth/me
#[utoipa::path(
    put,
    path = "/api/auth/me",
    tag = "Auth",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Invalid data or wrong current password")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_me(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let updated = app_state
        .auth_service
        .update_profile(&user, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(updated).with_message(app_state.i18n_store.t(&locale, "success.profile_updated")),
    ))
}
