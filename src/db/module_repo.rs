// src/db/module_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::module::Module};

// Catalog ('modules') and per-user grants ('user_module_permissions')
#[derive(Clone)]
pub struct ModuleRepository {
    pool: PgPool,
}

impl ModuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CATALOG
    // =========================================================================

    pub async fn list_active_modules(&self) -> Result<Vec<Module>, AppError> {
        let modules = sqlx::query_as::<_, Module>(
            r#"
            SELECT id, name, display_name, route, icon, sort_order, parent_id, is_active
            FROM modules
            WHERE is_active = TRUE
            ORDER BY sort_order ASC, display_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(modules)
    }

    pub async fn count_modules(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn module_exists<'e, E>(&self, executor: E, module_id: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM modules WHERE id = $1)")
                .bind(module_id)
                .fetch_one(executor)
                .await?;
        Ok(exists)
    }

    /// Inserts or refreshes one catalog entry, keyed by id.
    pub async fn upsert_module<'e, E>(&self, executor: E, module: &Module) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO modules (id, name, display_name, route, icon, sort_order, parent_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                route = EXCLUDED.route,
                icon = EXCLUDED.icon,
                sort_order = EXCLUDED.sort_order
            "#,
        )
        .bind(&module.id)
        .bind(&module.name)
        .bind(&module.display_name)
        .bind(&module.route)
        .bind(module.icon.as_deref())
        .bind(module.sort_order)
        .bind(module.parent_id.as_deref())
        .bind(module.is_active)
        .execute(executor)
        .await?;
        Ok(())
    }

    // =========================================================================
    //  GRANTS
    // =========================================================================

    /// Active modules the user holds a `granted = true` row for.
    pub async fn granted_modules(&self, user_id: Uuid) -> Result<Vec<Module>, AppError> {
        let modules = sqlx::query_as::<_, Module>(
            r#"
            SELECT m.id, m.name, m.display_name, m.route, m.icon, m.sort_order, m.parent_id, m.is_active
            FROM modules m
            INNER JOIN user_module_permissions p ON p.module_id = m.id
            WHERE p.user_id = $1 AND p.granted = TRUE AND m.is_active = TRUE
            ORDER BY m.sort_order ASC, m.display_name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(modules)
    }

    /// Every stored row for the user as (module_id, granted).
    pub async fn grant_rows(&self, user_id: Uuid) -> Result<Vec<(String, bool)>, AppError> {
        let rows: Vec<(String, bool)> = sqlx::query_as(
            "SELECT module_id, granted FROM user_module_permissions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// First write inserts the row, later writes flip it in place.
    pub async fn upsert_permission<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        module_id: &str,
        granted: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO user_module_permissions (user_id, module_id, granted)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, module_id) DO UPDATE SET
                granted = EXCLUDED.granted,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(module_id)
        .bind(granted)
        .execute(executor)
        .await?;
        Ok(())
    }
}
