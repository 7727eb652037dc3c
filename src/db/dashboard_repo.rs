// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::dashboard::DashboardSummary};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cards of the home page. `sales_of = None` sums everyone's sales.
    pub async fn get_summary<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        sales_of: Option<Uuid>,
        today: NaiveDate,
    ) -> Result<DashboardSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // One snapshot for every card
        let mut tx = executor.begin().await?;

        // A. Customers
        let total_customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&mut *tx)
            .await?;

        // B. Open deals (count and pipeline value)
        let (open_deals, open_deals_value): (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(value), 0)
            FROM deals
            WHERE stage NOT IN ('won', 'lost')
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        // C. Caller's open tasks
        let my_open_tasks: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tasks
            WHERE assigned_to = $1 AND status IN ('pending', 'in_progress')
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        // D. Sales of the current month
        let sales_this_month: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount), 0)
            FROM sales
            WHERE date_trunc('month', sale_date) = date_trunc('month', $1::date)
              AND ($2::uuid IS NULL OR sold_by = $2)
            "#,
        )
        .bind(today)
        .bind(sales_of)
        .fetch_one(&mut *tx)
        .await?;

        // E. Today's report
        let report_submitted_today: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM daily_reports WHERE user_id = $1 AND report_date = $2)",
        )
        .bind(user_id)
        .bind(today)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DashboardSummary {
            total_customers,
            open_deals,
            open_deals_value,
            my_open_tasks,
            sales_this_month,
            report_submitted_today,
        })
    }

    /// Headline numbers fed to the voice assistant as context.
    pub async fn voice_context(&self, user_id: Uuid) -> Result<VoiceContext, AppError> {
        let row: VoiceContext = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM customers) AS customers,
                (SELECT COUNT(*) FROM deals WHERE stage NOT IN ('won', 'lost')) AS open_deals,
                (SELECT COUNT(*) FROM tasks
                   WHERE assigned_to = $1 AND status IN ('pending', 'in_progress')) AS open_tasks,
                (SELECT COUNT(*) FROM chat_messages
                   WHERE receiver_id = $1 AND is_read = FALSE) AS unread_messages
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct VoiceContext {
    pub customers: i64,
    pub open_deals: i64,
    pub open_tasks: i64,
    pub unread_messages: i64,
}
