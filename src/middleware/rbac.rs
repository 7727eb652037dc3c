// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::User,
    policy::AccessPolicy,
};

/// A role check answered by the access policy.
pub trait RoleGate: Send + Sync + 'static {
    fn check(policy: &AccessPolicy, role: &str) -> Result<(), AppError>;
}

/// Extractor that only lets through users whose role passes `G`.
pub struct RequireRole<G> {
    pub user: User,
    _gate: PhantomData<G>,
}

impl<G, S> FromRequestParts<S> for RequireRole<G>
where
    G: RoleGate,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        // A. Authenticated user
        let AuthenticatedUser(user) = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, app_state.i18n_store))?;

        // B. Role against the policy
        if let Err(e) = G::check(&app_state.policy, &user.role) {
            tracing::debug!(user_id = %user.id, role = %user.role, "role check refused");
            return Err(e.to_api_error(&locale, app_state.i18n_store));
        }

        Ok(RequireRole {
            user,
            _gate: PhantomData,
        })
    }
}

// ---
// GATES
// ---

pub struct Managers;
impl RoleGate for Managers {
    fn check(policy: &AccessPolicy, role: &str) -> Result<(), AppError> {
        policy.require_manager(role)
    }
}

pub struct UserAdmins;
impl RoleGate for UserAdmins {
    fn check(policy: &AccessPolicy, role: &str) -> Result<(), AppError> {
        if policy.can_manage_users(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

pub type RequireManager = RequireRole<Managers>;
pub type RequireUserAdmin = RequireRole<UserAdmins>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_follow_the_policy() {
        let policy = AccessPolicy::default();

        assert!(Managers::check(&policy, "CEO").is_ok());
        assert!(matches!(
            Managers::check(&policy, "sales_agent"),
            Err(AppError::Forbidden)
        ));
        assert!(UserAdmins::check(&policy, "مدیر فروش").is_ok());
        assert!(matches!(UserAdmins::check(&policy, ""), Err(AppError::Forbidden)));
    }
}
