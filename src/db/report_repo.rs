// src/db/report_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::report::{DailyReport, ReportFilter, ReportWithAuthor, SubmitReportPayload},
};

#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One report per user and day: a second submission replaces the first.
    pub async fn upsert_report(
        &self,
        user_id: Uuid,
        report_date: NaiveDate,
        work_hours: Decimal,
        input: &SubmitReportPayload,
    ) -> Result<DailyReport, AppError> {
        let report = sqlx::query_as::<_, DailyReport>(
            r#"
            INSERT INTO daily_reports (
                user_id, report_date, work_hours,
                completed_tasks, achievements, challenges, next_day_plan
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, report_date) DO UPDATE SET
                work_hours = EXCLUDED.work_hours,
                completed_tasks = EXCLUDED.completed_tasks,
                achievements = EXCLUDED.achievements,
                challenges = EXCLUDED.challenges,
                next_day_plan = EXCLUDED.next_day_plan,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(report_date)
        .bind(work_hours)
        .bind(input.completed_tasks.as_deref())
        .bind(input.achievements.as_deref())
        .bind(input.challenges.as_deref())
        .bind(input.next_day_plan.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(report)
    }

    pub async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<ReportWithAuthor>, AppError> {
        let reports = sqlx::query_as::<_, ReportWithAuthor>(
            r#"
            SELECT r.*, u.name AS author_name
            FROM daily_reports r
            INNER JOIN users u ON u.id = r.user_id
            WHERE ($1::uuid IS NULL OR r.user_id = $1)
              AND ($2::date IS NULL OR r.report_date >= $2)
              AND ($3::date IS NULL OR r.report_date <= $3)
            ORDER BY r.report_date DESC, u.name ASC
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }

    pub async fn find_report(&self, id: Uuid) -> Result<Option<ReportWithAuthor>, AppError> {
        let report = sqlx::query_as::<_, ReportWithAuthor>(
            r#"
            SELECT r.*, u.name AS author_name
            FROM daily_reports r
            INNER JOIN users u ON u.id = r.user_id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(report)
    }

    pub async fn has_report_on(&self, user_id: Uuid, day: NaiveDate) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM daily_reports WHERE user_id = $1 AND report_date = $2)",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
