use crate::config::moderation::ModerationConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{ActionKind, ModerationActionModel, TargetKind};
use crate::response::ApiResponse;
use crate::services::moderation::{ActionWarning, ApplyAction, ModerationService};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    response::IntoResponse,
    Extension, Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApplyActionRequest {
    pub target_type: TargetKind,
    #[validate(range(min = 1))]
    pub target_id: i32,
    pub action: ActionKind,
    /// Hours until the action expires; required for temporary bans
    pub duration: Option<u32>,
    /// Recorded on the audit entry and as the ban reason
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListActionsQuery {
    pub target_type: TargetKind,
    pub target_id: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModerationActionResponse {
    pub id: i32,
    pub action_type: ActionKind,
    pub target_type: TargetKind,
    pub target_id: i32,
    /// User the action landed on, when it was redirected to an author
    pub subject_user_id: Option<i32>,
    pub report_id: Option<i32>,
    pub moderator_id: i32,
    pub reason: String,
    pub notes: Option<String>,
    pub expires_at: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<ModerationActionModel> for ModerationActionResponse {
    fn from(a: ModerationActionModel) -> Self {
        Self {
            id: a.id,
            action_type: a.action_type,
            target_type: a.target_type,
            target_id: a.target_id,
            subject_user_id: a.subject_user_id,
            report_id: a.report_id,
            moderator_id: a.moderator_id,
            reason: a.reason,
            notes: a.notes,
            expires_at: a.expires_at.map(|t| t.to_string()),
            is_active: a.is_active,
            created_at: a.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplyActionResponse {
    pub action: ModerationActionResponse,
    pub warning: Option<ActionWarning>,
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/actions",
    security(("jwt_token" = [])),
    request_body = ApplyActionRequest,
    responses(
        (status = 200, description = "Action recorded; `warning` is set on partial enforcement", body = ApplyActionResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Moderators and admins only", body = AppError),
        (status = 404, description = "Target not found", body = AppError),
        (status = 422, description = "Action does not apply to this target type", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn apply_action(
    Extension(db): Extension<DatabaseConnection>,
    Extension(config): Extension<ModerationConfig>,
    auth_user: AuthUser,
    payload: Result<Json<ApplyActionRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate()?;

    let service = ModerationService::new(db, config);
    let outcome = service
        .apply_action(
            auth_user,
            ApplyAction {
                target_type: payload.target_type,
                target_id: payload.target_id,
                action: payload.action,
                duration_hours: payload.duration,
                reason: payload.reason,
                notes: payload.notes,
            },
        )
        .await?;

    let message = outcome.warning.as_ref().map(ActionWarning::message);
    let body = ApplyActionResponse {
        action: ModerationActionResponse::from(outcome.action),
        warning: outcome.warning,
    };

    Ok(ApiResponse::ok(body).with_message(message))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/actions",
    security(("jwt_token" = [])),
    params(
        ("target_type" = TargetKind, Query, description = "Target type"),
        ("target_id" = i32, Query, description = "Target ID"),
    ),
    responses(
        (status = 200, description = "Actions on the target, newest first", body = Vec<ModerationActionResponse>),
        (status = 403, description = "Moderators and admins only", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn list_actions(
    Extension(db): Extension<DatabaseConnection>,
    Extension(config): Extension<ModerationConfig>,
    auth_user: AuthUser,
    params: Result<Query<ListActionsQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;

    let service = ModerationService::new(db, config);
    let actions = service
        .list_actions(auth_user, params.target_type, params.target_id)
        .await?;
    let items: Vec<ModerationActionResponse> = actions
        .into_iter()
        .map(ModerationActionResponse::from)
        .collect();

    Ok(ApiResponse::ok(items))
}
