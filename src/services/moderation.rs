//! Enforcement: validates an action against its target, writes the audit
//! record and mutates the target.
//!
//! The audit row is inserted first and the target mutation runs in a nested
//! savepoint, so a failed mutation never takes the audit trail with it.

use crate::{
    config::moderation::ModerationConfig,
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{
        comment, moderation_action, post, user, ActionKind, Comment, ModerationAction,
        ModerationActionModel, Post, TargetKind, User, UserModel,
    },
    services::resolver,
};
use chrono::{Duration, NaiveDateTime};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Reason recorded on standalone actions when the moderator gives none.
pub const DEFAULT_REASON: &str = "moderator_discretion";

/// A validated action, ready to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPlan {
    pub action: ActionKind,
    pub target_type: TargetKind,
    pub target_id: i32,
    /// Who a ban lands on. `None` for non-ban actions, or when the author of
    /// the content no longer exists.
    pub subject_user_id: Option<i32>,
    pub duration_hours: Option<u32>,
}

impl ActionPlan {
    pub fn expires_at(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        self.duration_hours
            .map(|hours| now + Duration::hours(i64::from(hours)))
    }
}

pub struct ActionContext {
    pub moderator_id: i32,
    pub reason: String,
    pub notes: Option<String>,
    pub report_id: Option<i32>,
}

/// The audit record stands but the target was not (fully) changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionWarning {
    AuthorUnresolved {
        target_type: TargetKind,
        target_id: i32,
    },
    TargetMutationFailed {
        target_type: TargetKind,
        target_id: i32,
    },
}

impl ActionWarning {
    pub fn message(&self) -> String {
        match self {
            ActionWarning::AuthorUnresolved {
                target_type,
                target_id,
            } => format!(
                "Action recorded, but the author of {} {} could not be resolved; nobody was banned",
                target_type.as_str(),
                target_id
            ),
            ActionWarning::TargetMutationFailed {
                target_type,
                target_id,
            } => format!(
                "Action recorded, but {} {} could not be updated",
                target_type.as_str(),
                target_id
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: ModerationActionModel,
    pub warning: Option<ActionWarning>,
}

/// Checks that need no database access: action kind, target kind and
/// duration.
pub fn validate_action(
    action: ActionKind,
    target_type: TargetKind,
    duration_hours: Option<u32>,
    config: &ModerationConfig,
) -> AppResult<()> {
    match action {
        ActionKind::None => {
            return Err(AppError::Validation(
                "action 'none' cannot be applied".to_string(),
            ));
        }
        ActionKind::ContentRemoval if !target_type.supports_removal() => {
            return Err(AppError::UnsupportedTarget {
                action,
                target: target_type,
            });
        }
        _ => {}
    }

    match (action, duration_hours) {
        (_, Some(0)) => Err(AppError::Validation(
            "duration must be at least 1 hour".to_string(),
        )),
        (_, Some(hours)) if hours > config.max_ban_hours => Err(AppError::Validation(format!(
            "duration must not exceed {} hours",
            config.max_ban_hours
        ))),
        (ActionKind::TemporaryBan, None) => Err(AppError::Validation(
            "temporary_ban requires a duration".to_string(),
        )),
        (ActionKind::PermanentBan, Some(_)) => Err(AppError::Validation(
            "permanent_ban does not take a duration".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Validate the action and resolve its target. Nothing is written.
pub async fn plan<C: ConnectionTrait>(
    db: &C,
    action: ActionKind,
    target_type: TargetKind,
    target_id: i32,
    duration_hours: Option<u32>,
    config: &ModerationConfig,
) -> AppResult<ActionPlan> {
    validate_action(action, target_type, duration_hours, config)?;

    // Bans move from content to whoever is accountable for it.
    let subject_user_id = if action.is_ban() {
        resolver::resolve_author(db, target_type, target_id).await?
    } else {
        resolver::resolve(db, target_type, target_id).await?;
        None
    };

    Ok(ActionPlan {
        action,
        target_type,
        target_id,
        subject_user_id,
        duration_hours,
    })
}

/// Run a plan. On a [`DatabaseConnection`] this opens a transaction; on an
/// open transaction it nests as a savepoint.
pub async fn execute<C: TransactionTrait>(
    conn: &C,
    plan: &ActionPlan,
    ctx: &ActionContext,
) -> AppResult<ActionOutcome> {
    let txn = conn.begin().await?;
    let now = chrono::Utc::now().naive_utc();

    let audit = moderation_action::ActiveModel {
        action_type: Set(plan.action),
        target_type: Set(plan.target_type),
        target_id: Set(plan.target_id),
        subject_user_id: Set(plan.subject_user_id),
        report_id: Set(ctx.report_id),
        moderator_id: Set(ctx.moderator_id),
        reason: Set(ctx.reason.clone()),
        notes: Set(ctx.notes.clone()),
        expires_at: Set(plan.expires_at(now)),
        is_active: Set(true),
        created_at: Set(now),
        ..Default::default()
    };
    let audit = match audit.insert(&txn).await {
        Ok(audit) => audit,
        Err(e) => {
            txn.rollback().await?;
            return Err(e.into());
        }
    };

    let warning = match plan.subject_user_id {
        None if plan.action.is_ban() => Some(ActionWarning::AuthorUnresolved {
            target_type: plan.target_type,
            target_id: plan.target_id,
        }),
        _ => mutate_in_savepoint(&txn, plan, ctx, &audit).await?,
    };

    txn.commit().await?;

    match &warning {
        Some(w) => tracing::warn!(
            action_id = audit.id,
            action = plan.action.as_str(),
            "Partial failure: {}",
            w.message()
        ),
        None => tracing::info!(
            action_id = audit.id,
            action = plan.action.as_str(),
            target_type = plan.target_type.as_str(),
            target_id = plan.target_id,
            moderator_id = ctx.moderator_id,
            "Moderation action applied"
        ),
    }

    Ok(ActionOutcome {
        action: audit,
        warning,
    })
}

async fn mutate_in_savepoint(
    txn: &sea_orm::DatabaseTransaction,
    plan: &ActionPlan,
    ctx: &ActionContext,
    audit: &ModerationActionModel,
) -> Result<Option<ActionWarning>, DbErr> {
    let savepoint = txn.begin().await?;
    let failed = ActionWarning::TargetMutationFailed {
        target_type: plan.target_type,
        target_id: plan.target_id,
    };

    match mutate_target(&savepoint, plan, ctx, audit).await {
        Ok(true) => {
            savepoint.commit().await?;
            Ok(None)
        }
        Ok(false) => {
            savepoint.rollback().await?;
            Ok(Some(failed))
        }
        Err(e) => {
            tracing::warn!(action_id = audit.id, "Target mutation failed: {}", e);
            savepoint.rollback().await?;
            Ok(Some(failed))
        }
    }
}

/// Returns `false` when the row to change has vanished.
async fn mutate_target<C: ConnectionTrait>(
    db: &C,
    plan: &ActionPlan,
    ctx: &ActionContext,
    audit: &ModerationActionModel,
) -> Result<bool, DbErr> {
    let rows = match plan.action {
        ActionKind::None | ActionKind::Warning => return Ok(true),
        ActionKind::ContentRemoval => match plan.target_type {
            TargetKind::Post => {
                Post::update_many()
                    .set(post::ActiveModel {
                        is_removed: Set(true),
                        removed_at: Set(Some(audit.created_at)),
                        removed_by: Set(Some(ctx.moderator_id)),
                        ..Default::default()
                    })
                    .filter(post::Column::Id.eq(plan.target_id))
                    .exec(db)
                    .await?
                    .rows_affected
            }
            TargetKind::Comment => {
                Comment::update_many()
                    .set(comment::ActiveModel {
                        is_removed: Set(true),
                        removed_at: Set(Some(audit.created_at)),
                        removed_by: Set(Some(ctx.moderator_id)),
                        ..Default::default()
                    })
                    .filter(comment::Column::Id.eq(plan.target_id))
                    .exec(db)
                    .await?
                    .rows_affected
            }
            TargetKind::User | TargetKind::Message | TargetKind::Conversation => 0,
        },
        ActionKind::TemporaryBan | ActionKind::PermanentBan => {
            let Some(subject) = plan.subject_user_id else {
                return Ok(false);
            };
            let Some(current) = User::find_by_id(subject).one(db).await? else {
                return Ok(false);
            };
            let now = audit.created_at;
            let until = merged_ban_end(&current, now, audit.expires_at);
            let extends = !current.is_banned_at(now) || until != current.banned_until;
            if !extends {
                tracing::info!(
                    action_id = audit.id,
                    user_id = subject,
                    "Existing ban outlasts the new one, left unchanged"
                );
                return Ok(true);
            }
            User::update_many()
                .set(user::ActiveModel {
                    is_banned: Set(true),
                    banned_until: Set(until),
                    ban_reason: Set(Some(ctx.reason.clone())),
                    ..Default::default()
                })
                .filter(user::Column::Id.eq(subject))
                .exec(db)
                .await?
                .rows_affected
        }
    };

    Ok(rows > 0)
}

/// End of a user's ban after adding one that ends at `new_end` (`None` is
/// permanent). A ban already in force is never shortened.
fn merged_ban_end(
    current: &UserModel,
    now: NaiveDateTime,
    new_end: Option<NaiveDateTime>,
) -> Option<NaiveDateTime> {
    if !current.is_banned_at(now) {
        return new_end;
    }
    match (current.banned_until, new_end) {
        (None, _) | (_, None) => None,
        (Some(current_end), Some(new_end)) => Some(current_end.max(new_end)),
    }
}

/// A standalone enforcement request, outside any report.
pub struct ApplyAction {
    pub target_type: TargetKind,
    pub target_id: i32,
    pub action: ActionKind,
    pub duration_hours: Option<u32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

pub struct ModerationService {
    db: DatabaseConnection,
    config: ModerationConfig,
}

impl ModerationService {
    pub fn new(db: DatabaseConnection, config: ModerationConfig) -> Self {
        Self { db, config }
    }

    pub async fn apply_action(&self, caller: AuthUser, req: ApplyAction) -> AppResult<ActionOutcome> {
        caller.require_staff()?;

        let plan = plan(
            &self.db,
            req.action,
            req.target_type,
            req.target_id,
            req.duration_hours,
            &self.config,
        )
        .await?;

        let reason = req
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_string());

        let ctx = ActionContext {
            moderator_id: caller.user_id,
            reason,
            notes: req.notes,
            report_id: None,
        };

        execute(&self.db, &plan, &ctx).await
    }

    /// Audit history of one target, newest first.
    pub async fn list_actions(
        &self,
        caller: AuthUser,
        target_type: TargetKind,
        target_id: i32,
    ) -> AppResult<Vec<ModerationActionModel>> {
        caller.require_staff()?;

        let actions = ModerationAction::find()
            .filter(moderation_action::Column::TargetType.eq(target_type))
            .filter(moderation_action::Column::TargetId.eq(target_id))
            .order_by_desc(moderation_action::Column::CreatedAt)
            .order_by_desc(moderation_action::Column::Id)
            .all(&self.db)
            .await?;
        Ok(actions)
    }
}
