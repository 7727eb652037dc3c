// src/services/report_service.rs

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::{
    common::error::{AppError, Resource},
    db::{dashboard_repo::VoiceContext, DashboardRepository, ReportRepository},
    models::report::{
        AnalysisResult, AnalysisSource, AnalyzeReportsPayload, DailyReport, ReportFilter,
        ReportWithAuthor, SubmitReportPayload, VoiceAnswer,
    },
    services::ai_client::AiClient,
};

/// Report fields longer than this are cut before going into a prompt.
const MAX_FIELD_CHARS: usize = 600;

/// Days covered by an analysis when no `from` is given.
const DEFAULT_ANALYSIS_DAYS: i64 = 7;

// =============================================================================
//  PURE HELPERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportStats {
    pub count: usize,
    /// Rounded to one decimal.
    pub average_hours: Decimal,
    pub with_challenges: usize,
    pub with_achievements: usize,
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

pub fn report_stats(reports: &[ReportWithAuthor]) -> ReportStats {
    let count = reports.len();
    let average_hours = if count == 0 {
        Decimal::ZERO
    } else {
        let total: Decimal = reports.iter().map(|r| r.report.work_hours).sum();
        (total / Decimal::from(count as u64))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    };

    ReportStats {
        count,
        average_hours,
        with_challenges: reports.iter().filter(|r| has_text(&r.report.challenges)).count(),
        with_achievements: reports.iter().filter(|r| has_text(&r.report.achievements)).count(),
    }
}

/// Deterministic summary used whenever the AI proxy can't answer.
pub fn fallback_summary(stats: &ReportStats) -> String {
    format!(
        "تحلیل خودکار گزارش‌ها (بدون هوش مصنوعی):\n\
         - تعداد گزارش‌های بررسی‌شده: {}\n\
         - میانگین ساعات کاری: {:.1} ساعت\n\
         - گزارش‌های دارای چالش: {}\n\
         - گزارش‌های دارای دستاورد: {}",
        stats.count, stats.average_hours, stats.with_challenges, stats.with_achievements
    )
}

fn clip(text: Option<&str>) -> String {
    let text = text.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("-");
    if text.chars().count() > MAX_FIELD_CHARS {
        let cut: String = text.chars().take(MAX_FIELD_CHARS).collect();
        format!("{}…", cut)
    } else {
        text.to_string()
    }
}

/// Fixed Persian instructions followed by one block per report.
pub fn build_analysis_prompt(reports: &[ReportWithAuthor]) -> String {
    let mut prompt = String::from(
        "شما یک تحلیلگر منابع انسانی و مدیریت عملکرد هستید. گزارش‌های روزانه زیر را بررسی کنید \
         و به زبان فارسی یک تحلیل کوتاه ارائه دهید شامل: ۱) خلاصه عملکرد تیم، ۲) نقاط قوت، \
         ۳) چالش‌های تکرارشونده، ۴) پیشنهادهای عملی برای بهبود.\n\n",
    );

    for (index, r) in reports.iter().enumerate() {
        prompt.push_str(&format!(
            "گزارش {}:\nنام: {}\nتاریخ: {}\nساعات کاری: {}\nکارهای انجام‌شده: {}\nدستاوردها: {}\nچالش‌ها: {}\nبرنامه فردا: {}\n\n",
            index + 1,
            r.author_name,
            r.report.report_date,
            r.report.work_hours,
            clip(r.report.completed_tasks.as_deref()),
            clip(r.report.achievements.as_deref()),
            clip(r.report.challenges.as_deref()),
            clip(r.report.next_day_plan.as_deref()),
        ));
    }

    prompt
}

pub fn build_voice_prompt(question: &str, context: &VoiceContext) -> String {
    format!(
        "شما دستیار صوتی یک سامانه مدیریت ارتباط با مشتری هستید. کوتاه و به زبان فارسی پاسخ دهید.\n\
         وضعیت فعلی: {} مشتری، {} معامله باز، {} وظیفه باز برای کاربر، {} پیام خوانده‌نشده.\n\
         پرسش کاربر: {}",
        context.customers,
        context.open_deals,
        context.open_tasks,
        context.unread_messages,
        clip(Some(question)),
    )
}

pub fn voice_fallback(context: &VoiceContext) -> String {
    format!(
        "دستیار هوشمند در حال حاضر در دسترس نیست. خلاصه وضعیت: {} مشتری، {} معامله باز، \
         {} وظیفه باز و {} پیام خوانده‌نشده دارید.",
        context.customers, context.open_deals, context.open_tasks, context.unread_messages
    )
}

/// `to` defaults to today and `from` to a week before `to`.
pub fn analysis_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or(to - Duration::days(DEFAULT_ANALYSIS_DAYS - 1));
    if from > to {
        return Err(AppError::BadRequest("invalid_date_range"));
    }
    Ok((from, to))
}

pub fn validate_work_hours(hours: Decimal) -> Result<(), AppError> {
    if hours < Decimal::ZERO || hours > Decimal::from(24) {
        return Err(AppError::BadRequest("invalid_work_hours"));
    }
    Ok(())
}

// =============================================================================
//  SERVICE
// =============================================================================

#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    dashboard_repo: DashboardRepository,
    ai: AiClient,
}

impl ReportService {
    pub fn new(report_repo: ReportRepository, dashboard_repo: DashboardRepository, ai: AiClient) -> Self {
        Self {
            report_repo,
            dashboard_repo,
            ai,
        }
    }

    pub async fn submit_report(
        &self,
        user_id: Uuid,
        input: &SubmitReportPayload,
    ) -> Result<DailyReport, AppError> {
        validate_work_hours(input.work_hours)?;
        let report_date = input.report_date.unwrap_or_else(|| Utc::now().date_naive());
        let work_hours = input
            .work_hours
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);

        self.report_repo
            .upsert_report(user_id, report_date, work_hours, input)
            .await
    }

    /// Non-managers only ever see their own reports.
    pub async fn list_reports(
        &self,
        user_id: Uuid,
        is_manager: bool,
        mut filter: ReportFilter,
    ) -> Result<Vec<ReportWithAuthor>, AppError> {
        if !is_manager {
            filter.user_id = Some(user_id);
        }
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::BadRequest("invalid_date_range"));
            }
        }
        self.report_repo.list_reports(&filter).await
    }

    pub async fn get_report(
        &self,
        id: Uuid,
        user_id: Uuid,
        is_manager: bool,
    ) -> Result<ReportWithAuthor, AppError> {
        self.report_repo
            .find_report(id)
            .await?
            .filter(|r| is_manager || r.report.user_id == user_id)
            .ok_or(AppError::ResourceNotFound(Resource::Report))
    }

    /// AI analysis of a report range, with the statistical summary as fallback.
    pub async fn analyze(&self, input: &AnalyzeReportsPayload) -> Result<AnalysisResult, AppError> {
        let (from, to) = analysis_range(input.from, input.to, Utc::now().date_naive())?;
        let filter = ReportFilter {
            user_id: input.user_id,
            from: Some(from),
            to: Some(to),
        };

        let reports = self.report_repo.list_reports(&filter).await?;
        let stats = report_stats(&reports);

        if reports.is_empty() {
            return Ok(AnalysisResult {
                analysis: fallback_summary(&stats),
                source: AnalysisSource::Fallback,
                report_count: 0,
            });
        }

        let prompt = build_analysis_prompt(&reports);
        match self.ai.ask(&prompt).await {
            Ok(analysis) => Ok(AnalysisResult {
                analysis,
                source: AnalysisSource::Ai,
                report_count: stats.count,
            }),
            Err(e) => {
                tracing::warn!(error = %e, timeout = e.is_timeout(), "report analysis fell back to statistics");
                Ok(AnalysisResult {
                    analysis: fallback_summary(&stats),
                    source: AnalysisSource::Fallback,
                    report_count: stats.count,
                })
            }
        }
    }

    pub async fn ask_voice(&self, user_id: Uuid, question: &str) -> Result<VoiceAnswer, AppError> {
        let context = self.dashboard_repo.voice_context(user_id).await?;

        match self.ai.ask(&build_voice_prompt(question, &context)).await {
            Ok(answer) => Ok(VoiceAnswer {
                answer,
                source: AnalysisSource::Ai,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "voice answer fell back to canned text");
                Ok(VoiceAnswer {
                    answer: voice_fallback(&context),
                    source: AnalysisSource::Fallback,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::DailyReport;
    use std::str::FromStr;

    fn report(hours: &str, achievements: Option<&str>, challenges: Option<&str>) -> ReportWithAuthor {
        ReportWithAuthor {
            report: DailyReport {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                report_date: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
                work_hours: Decimal::from_str(hours).unwrap(),
                completed_tasks: Some("تماس با سه مشتری".into()),
                achievements: achievements.map(String::from),
                challenges: challenges.map(String::from),
                next_day_plan: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            author_name: "رضا".into(),
        }
    }

    #[test]
    fn stats_count_filled_fields_and_average_hours() {
        let reports = vec![
            report("8", Some("قرارداد جدید"), None),
            report("7", Some("  "), Some("تاخیر در پرداخت")),
            report("7.5", None, Some("قطعی اینترنت")),
        ];
        let stats = report_stats(&reports);

        assert_eq!(stats.count, 3);
        assert_eq!(stats.average_hours, Decimal::from_str("7.5").unwrap());
        assert_eq!(stats.with_challenges, 2);
        assert_eq!(stats.with_achievements, 1);

        let text = fallback_summary(&stats);
        assert!(text.contains("تعداد گزارش‌های بررسی‌شده: 3"));
        assert!(text.contains("7.5 ساعت"));
        assert!(text.contains("گزارش‌های دارای چالش: 2"));
        assert!(text.contains("گزارش‌های دارای دستاورد: 1"));
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        let reports = vec![report("8", None, None), report("7", None, None), report("7", None, None)];
        assert_eq!(
            report_stats(&reports).average_hours,
            Decimal::from_str("7.3").unwrap()
        );
        assert_eq!(report_stats(&[]).average_hours, Decimal::ZERO);
        assert!(fallback_summary(&report_stats(&[])).contains("0.0 ساعت"));
    }

    #[test]
    fn prompt_has_one_block_per_report() {
        let reports = vec![report("8", Some("x"), None), report("6", None, Some("y"))];
        let prompt = build_analysis_prompt(&reports);

        assert!(prompt.starts_with("شما یک تحلیلگر"));
        assert!(prompt.contains("گزارش 1:"));
        assert!(prompt.contains("گزارش 2:"));
        assert!(!prompt.contains("گزارش 3:"));
        assert!(prompt.contains("نام: رضا"));
        assert!(prompt.contains("تاریخ: 2026-10-14"));
    }

    #[test]
    fn long_fields_are_clipped() {
        let long = "ا".repeat(MAX_FIELD_CHARS + 50);
        let clipped = clip(Some(&long));
        assert_eq!(clipped.chars().count(), MAX_FIELD_CHARS + 1);
        assert_eq!(clip(None), "-");
    }

    #[test]
    fn analysis_range_defaults_and_validation() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let (from, to) = analysis_range(None, None, today).unwrap();
        assert_eq!(to, today);
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 10, 9).unwrap());

        let later = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        assert!(matches!(
            analysis_range(Some(later), Some(today), today),
            Err(AppError::BadRequest("invalid_date_range"))
        ));
    }

    #[test]
    fn work_hours_bounds() {
        assert!(validate_work_hours(Decimal::ZERO).is_ok());
        assert!(validate_work_hours(Decimal::from(24)).is_ok());
        assert!(validate_work_hours(Decimal::from(25)).is_err());
        assert!(validate_work_hours(Decimal::from(-1)).is_err());
    }

    #[test]
    fn voice_fallback_mentions_the_numbers() {
        let context = VoiceContext {
            customers: 12,
            open_deals: 3,
            open_tasks: 5,
            unread_messages: 1,
        };
        let text = voice_fallback(&context);
        assert!(text.contains("12 مشتری"));
        assert!(text.contains("5 وظیفه"));
        assert!(build_voice_prompt("وضعیت؟", &context).ends_with("پرسش کاربر: وضعیت؟"));
    }
}
