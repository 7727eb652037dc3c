// src/models/report.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_date: NaiveDate,

    #[schema(example = 8.5)]
    pub work_hours: Decimal,

    pub completed_tasks: Option<String>,
    pub achievements: Option<String>,
    pub challenges: Option<String>,
    pub next_day_plan: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Report joined with its author, input of the analysis prompt
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportWithAuthor {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub report: DailyReport,
    pub author_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportPayload {
    /// Defaults to today.
    #[schema(value_type = Option<String>, format = Date, example = "2026-10-15")]
    pub report_date: Option<NaiveDate>,

    #[schema(example = 8.0)]
    pub work_hours: Decimal,

    pub completed_tasks: Option<String>,
    pub achievements: Option<String>,
    pub challenges: Option<String>,
    pub next_day_plan: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    pub user_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeReportsPayload {
    pub user_id: Option<Uuid>,

    #[schema(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,

    #[schema(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub analysis: String,
    pub source: AnalysisSource,
    pub report_count: usize,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VoiceQuestionPayload {
    #[validate(length(min = 2, max = 1000, message = "invalid_length"))]
    #[schema(example = "امروز چند وظیفه باز دارم؟")]
    pub question: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAnswer {
    pub answer: String,
    pub source: AnalysisSource,
}
