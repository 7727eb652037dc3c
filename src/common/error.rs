// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

/// Entities that can be reported as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Customer,
    Company,
    Contact,
    Deal,
    Task,
    Product,
    Sale,
    Report,
    Module,
}

impl Resource {
    fn key(self) -> &'static str {
        match self {
            Resource::User => "resource.user",
            Resource::Customer => "resource.customer",
            Resource::Company => "resource.company",
            Resource::Contact => "resource.contact",
            Resource::Deal => "resource.deal",
            Resource::Task => "resource.task",
            Resource::Product => "resource.product",
            Resource::Sale => "resource.sale",
            Resource::Report => "resource.report",
            Resource::Module => "resource.module",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Request-level rule violation; the payload is the message key suffix.
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("email already exists")]
    EmailAlreadyExists,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or missing token")]
    InvalidToken,

    #[error("account is not active")]
    AccountDisabled,

    #[error("forbidden")]
    Forbidden,

    #[error("{0:?} not found")]
    ResourceNotFound(Resource),

    #[error("company still has {0} contacts")]
    CompanyHasContacts(i64),

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Error already rendered for a given locale; what the handlers return.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::EmailAlreadyExists
            | AppError::CompanyHasContacts(_)
            | AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::AccountDisabled | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_)
            | AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status();

        let (message, details) = match &self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                (store.translate(lang, "error.validation"), Some(json!(details)))
            }
            AppError::BadRequest(key) => {
                (store.translate(lang, &format!("error.bad_request.{}", key)), None)
            }
            AppError::EmailAlreadyExists => (store.translate(lang, "error.email_exists"), None),
            AppError::InvalidCredentials => {
                (store.translate(lang, "error.invalid_credentials"), None)
            }
            AppError::InvalidToken => (store.translate(lang, "error.invalid_token"), None),
            AppError::AccountDisabled => (store.translate(lang, "error.account_disabled"), None),
            AppError::Forbidden => (store.translate(lang, "error.forbidden"), None),
            AppError::ResourceNotFound(resource) => {
                let name = store.translate(lang, resource.key());
                (
                    store.translate_with(lang, "error.not_found", &[("resource", name)]),
                    None,
                )
            }
            AppError::CompanyHasContacts(count) => (
                store.translate_with(
                    lang,
                    "error.company_has_contacts",
                    &[("count", count.to_string())],
                ),
                Some(json!({ "contacts": count })),
            ),
            AppError::InvalidUpload(reason) => (
                store.translate(lang, "error.invalid_upload"),
                Some(json!({ "reason": reason })),
            ),
            internal => {
                // Full detail stays in the server log only.
                tracing::error!("internal server error: {}", internal);
                (store.translate(lang, "error.internal"), None)
            }
        };

        ApiError {
            status,
            message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "message": self.message,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

// Used where no locale is at hand (middleware rejections).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global())
            .into_response()
    }
}

/// Postgres `undefined_table`.
pub fn is_undefined_table(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("42P01"))
}

/// Unique email indexes (users, contacts) surface as `EmailAlreadyExists`.
pub fn map_unique_email(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::EmailAlreadyExists;
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use sqlx::error::{DatabaseError, ErrorKind};
    use validator::Validate;

    fn render(err: AppError, lang: &str) -> ApiError {
        err.to_api_error(&Locale(lang.to_string()), I18nStore::global())
    }

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::EmailAlreadyExists.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::CompanyHasContacts(2).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::ResourceNotFound(Resource::Task).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = render(AppError::ResourceNotFound(Resource::Customer), "en");
        assert_eq!(err.message, "Customer not found.");
        let err = render(AppError::ResourceNotFound(Resource::Customer), "fa");
        assert_eq!(err.message, "مشتری یافت نشد.");
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = render(
            AppError::InternalServerError(anyhow::anyhow!("connection refused at 10.0.0.3")),
            "en",
        );
        assert_eq!(err.message, "An unexpected error occurred.");
        assert!(err.details.is_none());
    }

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "required"))]
        name: String,
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let errors = Payload { name: String::new() }.validate().unwrap_err();
        let err = render(AppError::ValidationError(errors), "en");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.details.unwrap()["name"][0], "required");
    }

    #[tokio::test]
    async fn response_body_is_a_failure_envelope() {
        let response = AppError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "شما مجوز انجام این عملیات را ندارید.");
    }

    #[derive(Debug)]
    struct PgFailure {
        code: &'static str,
        unique: bool,
    }

    impl std::fmt::Display for PgFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "postgres error {}", self.code)
        }
    }

    impl StdError for PgFailure {}

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "postgres error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    fn pg_error(code: &'static str) -> sqlx::Error {
        let unique = code == "23505";
        sqlx::Error::Database(Box::new(PgFailure { code, unique }))
    }

    #[test]
    fn unique_violation_becomes_email_exists() {
        let err = map_unique_email(pg_error("23505"));
        assert!(matches!(err, AppError::EmailAlreadyExists));

        let err = map_unique_email(pg_error("23503"));
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[test]
    fn missing_table_is_recognised() {
        assert!(is_undefined_table(&pg_error("42P01")));
        assert!(!is_undefined_table(&pg_error("23505")));
        assert!(!is_undefined_table(&sqlx::Error::RowNotFound));
    }
}
