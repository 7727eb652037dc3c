// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    common::{
        error::{ApiError, AppError},
        i18n::I18nStore,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::auth::User,
};

/// Cookie set at login, read when no bearer token is sent.
pub const AUTH_COOKIE: &str = "auth-token";

/// `Authorization: Bearer <token>` wins over the cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(AUTH_COOKIE)
            .map(|cookie| cookie.value().trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

// Resolves the token to the current user row and stores it in the request
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, app_state.i18n_store);

    let token = extract_token(request.headers()).ok_or_else(|| to_api(AppError::InvalidToken))?;

    let user = app_state
        .auth_service
        .validate_token(&token)
        .await
        .map_err(to_api)?;

    if !user.is_active() {
        return Err(to_api(AppError::AccountDisabled));
    }

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Handler-side access to the user put in place by `auth_guard`
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                AppError::InvalidToken
                    .to_api_error(&Locale::from_headers(&parts.headers), I18nStore::global())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_is_preferred() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "auth-token=from-cookie"),
        ]);
        assert_eq!(extract_token(&h).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let h = headers(&[(header::COOKIE, "theme=dark; auth-token=abc.def.ghi")]);
        assert_eq!(extract_token(&h).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_malformed_tokens_yield_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Basic xyz")])), None);
        assert_eq!(extract_token(&headers(&[(header::AUTHORIZATION, "Bearer   ")])), None);
        assert_eq!(extract_token(&headers(&[(header::COOKIE, "auth-token=")])), None);
    }
}
