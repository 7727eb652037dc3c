// src/handlers/reports.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{envelope::Envelope, error::{ApiError, AppError}},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, rbac::RequireManager},
    models::report::{
        AnalysisResult, AnalyzeReportsPayload, DailyReport, ReportFilter, ReportWithAuthor,
        SubmitReportPayload, VoiceAnswer, VoiceQuestionPayload,
    },
};

// =============================================================================
//  DAILY REPORTS
// =============================================================================

// POST /api/reports
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "Reports",
    request_body = SubmitReportPayload,
    responses(
        (status = 200, description = "Report stored; a second submission for the same day replaces it", body = DailyReport),
        (status = 400, description = "Work hours outside 0..24")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_report(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<SubmitReportPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .report_service
        .submit_report(user.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(
        Envelope::ok(report).with_message(app_state.i18n_store.t(&locale, "success.report_saved")),
    ))
}

// GET /api/reports
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "Reports",
    params(
        ("userId" = Option<Uuid>, Query, description = "Managers only; others always get their own"),
        ("from" = Option<String>, Query, description = "YYYY-MM-DD"),
        ("to" = Option<String>, Query, description = "YYYY-MM-DD")
    ),
    responses((status = 200, description = "Reports, newest first", body = [ReportWithAuthor])),
    security(("api_jwt" = []))
)]
pub async fn list_reports(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<ReportFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let is_manager = app_state.policy.is_manager(&user.role);
    let reports = app_state
        .report_service
        .list_reports(user.id, is_manager, filter)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(reports)))
}

// GET /api/reports/{id}
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "Reports",
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report", body = ReportWithAuthor),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let is_manager = app_state.policy.is_manager(&user.role);
    let report = app_state
        .report_service
        .get_report(id, user.id, is_manager)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(report)))
}

// POST /api/reports/analyze
#[utoipa::path(
    post,
    path = "/api/reports/analyze",
    tag = "Reports",
    request_body = AnalyzeReportsPayload,
    responses(
        (status = 200, description = "AI analysis, or the statistical summary when the proxy fails", body = AnalysisResult),
        (status = 403, description = "Caller is not a manager")
    ),
    security(("api_jwt" = []))
)]
pub async fn analyze_reports(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireManager,
    payload: Option<Json<AnalyzeReportsPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();

    let result = app_state
        .report_service
        .analyze(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let mut body = Envelope::ok(result);
    if body.data.as_ref().is_some_and(|r| r.report_count == 0) {
        body = body.with_message(app_state.i18n_store.t(&locale, "success.analysis_no_reports"));
    }

    Ok(Json(body))
}

// =============================================================================
//  VOICE ASSISTANT
// =============================================================================

// POST /api/voice/ask
#[utoipa::path(
    post,
    path = "/api/voice/ask",
    tag = "Voice",
    request_body = VoiceQuestionPayload,
    responses((status = 200, description = "Answer to a transcribed question", body = VoiceAnswer)),
    security(("api_jwt" = []))
)]
pub async fn ask_voice(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<VoiceQuestionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let answer = app_state
        .report_service
        .ask_voice(user.id, payload.question.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(Json(Envelope::ok(answer)))
}
