// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, UpdateProfilePayload, User},
};

/// bcrypt on a blocking thread.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("password hashing task failed: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))??;
    Ok(valid)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl_days: i64,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, token_ttl_days: i64) -> Self {
        Self {
            user_repo,
            jwt_secret,
            token_ttl_days,
        }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<(String, User), AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        // Credentials first, so disabled accounts can't be enumerated
        if !user.is_active() {
            return Err(AppError::AccountDisabled);
        }

        self.user_repo.touch_last_login(user.id).await?;
        let token = self.create_token(&user)?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok((token, user))
    }

    /// Token -> current user row. Unknown users count as an invalid token.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.token_ttl_days);

        let claims = Claims {
            sub: user.id,
            role: user.role.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub fn token_ttl_days(&self) -> i64 {
        self.token_ttl_days
    }

    /// Self-service profile edit; a new password needs the current one.
    pub async fn update_profile(
        &self,
        user: &User,
        input: &UpdateProfilePayload,
    ) -> Result<User, AppError> {
        if let Some(new_password) = input.new_password.as_deref() {
            let current = input
                .current_password
                .as_deref()
                .ok_or(AppError::BadRequest("wrong_password"))?;

            if !verify_password(current, &user.password_hash).await? {
                return Err(AppError::BadRequest("wrong_password"));
            }

            let hashed = hash_password(new_password).await?;
            self.user_repo.set_password(user.id, &hashed).await?;
        }

        let changes = crate::models::user::UpdateUserPayload {
            name: input.name.clone(),
            phone: input.phone.clone(),
            ..Default::default()
        };

        self.user_repo
            .update_user(user.id, &changes)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    /// Creates the first account when the users table is empty.
    pub async fn bootstrap_admin(
        &self,
        pool: &PgPool,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        if self.user_repo.count().await? > 0 {
            return Ok(None);
        }

        let hashed = hash_password(password).await?;
        let user = self
            .user_repo
            .create_user(pool, "مدیر سیستم", email, &hashed, "ceo", None, None)
            .await?;

        tracing::info!(email = %user.email, "bootstrap administrator created");
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserStatus;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn service() -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AuthService::new(UserRepository::new(pool), "test-secret".into(), 7)
    }

    fn user(role: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "سارا".into(),
            email: "sara@example.com".into(),
            password_hash: String::new(),
            role: role.into(),
            status: UserStatus::Active,
            team: None,
            phone: None,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn token_round_trip_keeps_subject_and_role() {
        let auth = service();
        let user = user("sales_manager");
        let token = auth.create_token(&user).unwrap();

        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "sales_manager");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let other = AuthService::new(
            UserRepository::new(
                PgPoolOptions::new()
                    .connect_lazy("postgres://localhost/unused")
                    .unwrap(),
            ),
            "another-secret".into(),
            7,
        );
        let token = other.create_token(&user("ceo")).unwrap();

        assert!(matches!(
            service().decode_token(&token),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            service().decode_token("not-a-jwt"),
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn password_hashes_verify() {
        let hashed = hash_password("s3cret!").await.unwrap();
        assert!(verify_password("s3cret!", &hashed).await.unwrap());
        assert!(!verify_password("wrong", &hashed).await.unwrap());
    }
}
