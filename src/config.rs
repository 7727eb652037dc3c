// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        ChatRepository, CrmRepository, DashboardRepository, ModuleRepository, ReportRepository,
        SalesRepository, TaskRepository, UserRepository,
    },
    policy::AccessPolicy,
    services::{
        ai_client::AiClient, auth::AuthService, chat_service::ChatService,
        crm_service::CrmService, dashboard_service::DashboardService,
        permission_service::PermissionService, report_service::ReportService,
        sales_service::SalesService, task_service::TaskService, user_service::UserService,
    },
};

// =============================================================================
//  SETTINGS
// =============================================================================

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub token_ttl_days: i64,
    /// Unset disables the AI proxy; analysis and voice answers use the fallback text.
    pub ai_proxy_url: Option<String>,
    pub ai_timeout: Duration,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cookie_secure: bool,
    /// (email, password) of the account created when the users table is empty.
    pub bootstrap_admin: Option<(String, String)>,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: '{}'", key, raw)),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;

        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_EMAIL"),
            lookup("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            token_ttl_days: parse_or(&lookup, "TOKEN_TTL_DAYS", 7)?,
            ai_proxy_url: lookup("AI_PROXY_URL"),
            ai_timeout: Duration::from_secs(parse_or(&lookup, "AI_TIMEOUT_SECS", 60)?),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public/uploads/tasks")),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
            bootstrap_admin,
        })
    }
}

// =============================================================================
//  APPLICATION STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub policy: Arc<AccessPolicy>,
    pub i18n_store: &'static I18nStore,

    pub auth_service: AuthService,
    pub user_service: UserService,
    pub permission_service: PermissionService,
    pub crm_service: CrmService,
    pub task_service: TaskService,
    pub sales_service: SalesService,
    pub report_service: ReportService,
    pub chat_service: ChatService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("failed to connect to the database")?;

        tracing::info!("database connection established");

        Self::from_pool(db_pool, settings)
    }

    /// Builds the dependency graph over an existing pool.
    pub fn from_pool(db_pool: PgPool, settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);
        let policy = Arc::new(AccessPolicy::default());

        // --- Repositories ---
        let user_repo = UserRepository::new(db_pool.clone());
        let module_repo = ModuleRepository::new(db_pool.clone());
        let crm_repo = CrmRepository::new(db_pool.clone());
        let task_repo = TaskRepository::new(db_pool.clone());
        let sales_repo = SalesRepository::new(db_pool.clone());
        let report_repo = ReportRepository::new(db_pool.clone());
        let chat_repo = ChatRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        // --- Services ---
        let ai_client = AiClient::new(settings.ai_proxy_url.clone(), settings.ai_timeout)?;
        if !ai_client.is_enabled() {
            tracing::warn!("AI_PROXY_URL is not set, report analysis will use the local summary");
        }

        let auth_service = AuthService::new(
            user_repo.clone(),
            settings.jwt_secret.clone(),
            settings.token_ttl_days,
        );
        let user_service = UserService::new(user_repo.clone(), db_pool.clone());
        let permission_service = PermissionService::new(
            module_repo,
            user_repo.clone(),
            db_pool.clone(),
            policy.clone(),
        );
        let crm_service = CrmService::new(crm_repo.clone(), user_repo.clone());
        let task_service = TaskService::new(
            task_repo,
            user_repo.clone(),
            crm_repo.clone(),
            settings.upload_dir.clone(),
        );
        let sales_service = SalesService::new(sales_repo, crm_repo, db_pool.clone());
        let report_service = ReportService::new(report_repo, dashboard_repo.clone(), ai_client);
        let chat_service = ChatService::new(chat_repo, user_repo);
        let dashboard_service = DashboardService::new(dashboard_repo);

        Ok(Self {
            db_pool,
            settings,
            policy,
            i18n_store: I18nStore::global(),
            auth_service,
            user_service,
            permission_service,
            crm_service,
            task_service,
            sales_service,
            report_service,
            chat_service,
            dashboard_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/cem"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.db_max_connections, 5);
        assert_eq!(settings.token_ttl_days, 7);
        assert_eq!(settings.ai_timeout, Duration::from_secs(60));
        assert_eq!(settings.upload_dir, PathBuf::from("public/uploads/tasks"));
        assert_eq!(settings.max_upload_bytes, 10 * 1024 * 1024);
        assert!(!settings.cookie_secure);
        assert!(settings.ai_proxy_url.is_none());
        assert!(settings.bootstrap_admin.is_none());
    }

    #[test]
    fn missing_secret_is_reported_by_name() {
        let err = Settings::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("AI_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("AI_TIMEOUT_SECS"));
    }

    #[test]
    fn bootstrap_admin_needs_both_keys() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("BOOTSTRAP_ADMIN_EMAIL", "ceo@example.com"),
        ]))
        .unwrap();
        assert!(settings.bootstrap_admin.is_none());

        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("BOOTSTRAP_ADMIN_EMAIL", "ceo@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "changeme"),
        ]))
        .unwrap();
        assert_eq!(
            settings.bootstrap_admin,
            Some(("ceo@example.com".to_string(), "changeme".to_string()))
        );
    }
}
