use crate::config::moderation::ModerationConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::moderation::ModerationActionResponse;
use crate::middleware::AuthUser;
use crate::models::{
    ActionKind, Priority, ReportModel, ReportReason, ReportStatus, TargetKind, TargetSnapshot,
};
use crate::response::{page_params, ApiResponse, PaginatedResponse};
use crate::services::moderation::ActionWarning;
use crate::services::report::{NewReport, ReportChanges, ReportFilter, ReportService, ReportStats};
use crate::websocket::hub::NotificationHub;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReportRequest {
    /// Kind of record being reported
    pub target_type: TargetKind,
    /// ID of the reported record
    #[validate(range(min = 1))]
    pub target_id: i32,
    pub reason: ReportReason,
    /// Free-text context from the reporter
    pub description: Option<String>,
    /// Links to screenshots or archives, kept in order
    pub evidence: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListReportsQuery {
    pub status: Option<ReportStatus>,
    #[serde(rename = "type")]
    pub target_type: Option<TargetKind>,
    pub reason: Option<ReportReason>,
    pub moderator_id: Option<i32>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReportRequest {
    pub status: Option<ReportStatus>,
    #[validate(length(max = 5000))]
    pub moderator_notes: Option<String>,
    /// Enforcement to apply to the reported target
    pub action: Option<ActionKind>,
    /// Hours until the action expires; required for temporary bans
    pub action_duration: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub id: i32,
    pub reporter_id: i32,
    pub target_type: TargetKind,
    pub target_id: i32,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub evidence: Vec<String>,
    pub priority: Priority,
    pub status: ReportStatus,
    pub moderator_id: Option<i32>,
    pub moderator_notes: Option<String>,
    pub action: ActionKind,
    pub action_taken_at: Option<String>,
    pub action_expires_at: Option<String>,
    /// Snapshot of the target taken when the report was filed
    #[schema(value_type = Object)]
    pub target_data: TargetSnapshot,
    pub version: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ReportModel> for ReportResponse {
    fn from(r: ReportModel) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            target_type: r.target_type,
            target_id: r.target_id,
            reason: r.reason,
            description: r.description,
            evidence: r.evidence.0,
            priority: r.priority,
            status: r.status,
            moderator_id: r.moderator_id,
            moderator_notes: r.moderator_notes,
            action: r.action,
            action_taken_at: r.action_taken_at.map(|t| t.to_string()),
            action_expires_at: r.action_expires_at.map(|t| t.to_string()),
            target_data: r.target_data,
            version: r.version,
            created_at: r.created_at.to_string(),
            updated_at: r.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateReportResponse {
    pub report: ReportResponse,
    /// Audit record of the action taken, if any
    pub action: Option<ModerationActionResponse>,
    /// Set when the action was recorded but not fully applied
    pub warning: Option<ActionWarning>,
}

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    security(("jwt_token" = [])),
    request_body = CreateReportRequest,
    responses(
        (status = 200, description = "Report created", body = ReportResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Target not found", body = AppError),
        (status = 409, description = "An open report for this target already exists", body = AppError),
    ),
    tag = "reports"
)]
pub async fn create_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    Extension(config): Extension<ModerationConfig>,
    auth_user: AuthUser,
    payload: Result<Json<CreateReportRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate()?;

    let service = ReportService::new(db, hub, config);
    let report = service
        .create_report(
            auth_user,
            NewReport {
                target_type: payload.target_type,
                target_id: payload.target_id,
                reason: payload.reason,
                description: payload.description,
                evidence: payload.evidence.unwrap_or_default(),
            },
        )
        .await?;

    Ok(ApiResponse::ok(ReportResponse::from(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports",
    security(("jwt_token" = [])),
    params(
        ("status" = Option<ReportStatus>, Query, description = "Filter by status"),
        ("type" = Option<TargetKind>, Query, description = "Filter by target type"),
        ("reason" = Option<ReportReason>, Query, description = "Filter by reason"),
        ("moderator_id" = Option<i32>, Query, description = "Filter by handling moderator"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page (max 100)"),
    ),
    responses(
        (status = 200, description = "Reports, highest priority first", body = PaginatedResponse<ReportResponse>),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "reports"
)]
pub async fn list_reports(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    Extension(config): Extension<ModerationConfig>,
    auth_user: AuthUser,
    params: Result<Query<ListReportsQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let (page, per_page) = page_params(params.page, params.per_page);

    let filter = ReportFilter {
        status: params.status,
        target_type: params.target_type,
        reason: params.reason,
        moderator_id: params.moderator_id,
    };

    let service = ReportService::new(db, hub, config);
    let (reports, total) = service
        .list_reports(auth_user, filter, page, per_page)
        .await?;
    let items = reports.into_iter().map(ReportResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 403, description = "Not staff and not the reporter", body = AppError),
        (status = 404, description = "Report not found", body = AppError),
    ),
    tag = "reports"
)]
pub async fn get_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    Extension(config): Extension<ModerationConfig>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(db, hub, config);
    let report = service.get_report(auth_user, id).await?;
    Ok(ApiResponse::ok(ReportResponse::from(report)))
}

#[utoipa::path(
    put,
    path = "/api/v1/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = UpdateReportRequest,
    responses(
        (status = 200, description = "Report updated; `warning` is set on partial enforcement", body = UpdateReportResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Moderators and admins only", body = AppError),
        (status = 404, description = "Report or target not found", body = AppError),
        (status = 409, description = "Invalid transition or concurrent update", body = AppError),
        (status = 422, description = "Action does not apply to this target type", body = AppError),
    ),
    tag = "reports"
)]
pub async fn update_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    Extension(config): Extension<ModerationConfig>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateReportRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate()?;

    let service = ReportService::new(db, hub, config);
    let update = service
        .update_report(
            auth_user,
            id,
            ReportChanges {
                status: payload.status,
                moderator_notes: payload.moderator_notes,
                action: payload.action,
                action_duration: payload.action_duration,
            },
        )
        .await?;

    let (action, warning) = match update.action {
        Some(outcome) => (
            Some(ModerationActionResponse::from(outcome.action)),
            outcome.warning,
        ),
        None => (None, None),
    };
    let message = warning.as_ref().map(ActionWarning::message);
    let body = UpdateReportResponse {
        report: ReportResponse::from(update.report),
        action,
        warning,
    };

    Ok(ApiResponse::ok(body).with_message(message))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report deleted", body = String),
        (status = 403, description = "Only an admin or the reporter may delete", body = AppError),
        (status = 404, description = "Report not found", body = AppError),
        (status = 409, description = "Report is no longer pending", body = AppError),
    ),
    tag = "reports"
)]
pub async fn delete_report(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    Extension(config): Extension<ModerationConfig>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(db, hub, config);
    service.delete_report(auth_user, id).await?;
    Ok(ApiResponse::ok("Report deleted"))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Report counts per status", body = ReportStats),
        (status = 403, description = "Moderators and admins only", body = AppError),
    ),
    tag = "reports"
)]
pub async fn report_stats(
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
    Extension(config): Extension<ModerationConfig>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let service = ReportService::new(db, hub, config);
    let stats = service.report_stats(auth_user).await?;
    Ok(ApiResponse::ok(stats))
}
