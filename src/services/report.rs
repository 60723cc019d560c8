use crate::{
    config::moderation::ModerationConfig,
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{
        report, ActionKind, Evidence, Report, ReportModel, ReportReason, ReportStatus, TargetKind,
    },
    services::{
        moderation::{self, ActionContext, ActionOutcome},
        notification::{self, NotificationService},
        priority, reliability, report_state, resolver,
    },
    websocket::hub::NotificationHub,
};
use sea_orm::{
    sea_query::{Expr, Order},
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr, TransactionTrait,
};
use serde::Serialize;
use utoipa::ToSchema;

const MAX_EVIDENCE_URL_LEN: usize = 2048;

pub struct NewReport {
    pub target_type: TargetKind,
    pub target_id: i32,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub target_type: Option<TargetKind>,
    pub reason: Option<ReportReason>,
    pub moderator_id: Option<i32>,
}

#[derive(Debug, Default, Clone)]
pub struct ReportChanges {
    pub status: Option<ReportStatus>,
    pub moderator_notes: Option<String>,
    pub action: Option<ActionKind>,
    pub action_duration: Option<u32>,
}

pub struct ReportUpdate {
    pub report: ReportModel,
    pub action: Option<ActionOutcome>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportStats {
    pub pending: u64,
    pub investigating: u64,
    pub resolved: u64,
    pub dismissed: u64,
    pub total: u64,
}

pub struct ReportService {
    db: DatabaseConnection,
    notifications: NotificationService,
    config: ModerationConfig,
}

/// Intake checks that need no database access.
pub fn validate_new_report(
    reporter_id: i32,
    new: &NewReport,
    config: &ModerationConfig,
) -> AppResult<()> {
    if new.target_type == TargetKind::User && new.target_id == reporter_id {
        return Err(AppError::Validation(
            "You cannot report yourself".to_string(),
        ));
    }

    if let Some(description) = &new.description {
        if description.chars().count() > config.description_max {
            return Err(AppError::Validation(format!(
                "description must be at most {} characters",
                config.description_max
            )));
        }
    }

    if new.evidence.len() > config.max_evidence {
        return Err(AppError::Validation(format!(
            "at most {} evidence links are allowed",
            config.max_evidence
        )));
    }

    for url in &new.evidence {
        let is_web = url.starts_with("https://") || url.starts_with("http://");
        let has_host = url
            .split_once("://")
            .is_some_and(|(_, rest)| !rest.is_empty() && !rest.starts_with('/'));
        let well_formed = is_web
            && has_host
            && url.len() <= MAX_EVIDENCE_URL_LEN
            && !url.contains(char::is_whitespace);
        if !well_formed {
            return Err(AppError::Validation(format!(
                "evidence must be http(s) URLs of at most {} characters",
                MAX_EVIDENCE_URL_LEN
            )));
        }
    }

    Ok(())
}

/// A unique violation on insert means an active report slipped in between
/// the duplicate check and the write.
fn map_insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateReport,
        _ => AppError::Database(err),
    }
}

impl ReportService {
    pub fn new(db: DatabaseConnection, hub: NotificationHub, config: ModerationConfig) -> Self {
        Self {
            notifications: NotificationService::new(db.clone(), hub),
            db,
            config,
        }
    }

    pub async fn create_report(&self, caller: AuthUser, new: NewReport) -> AppResult<ReportModel> {
        validate_new_report(caller.user_id, &new, &self.config)?;

        let duplicates = Report::find()
            .filter(report::Column::ReporterId.eq(caller.user_id))
            .filter(report::Column::TargetType.eq(new.target_type))
            .filter(report::Column::TargetId.eq(new.target_id))
            .filter(report::Column::Status.is_in(ReportStatus::active()))
            .count(&self.db)
            .await?;
        if duplicates > 0 {
            return Err(AppError::DuplicateReport);
        }

        let snapshot = resolver::resolve(&self.db, new.target_type, new.target_id).await?;

        let record = reliability::track_record(&self.db, caller.user_id).await?;
        let priority = priority::score(new.reason, record.adjustment());

        let description = new
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let now = chrono::Utc::now().naive_utc();
        let model = report::ActiveModel {
            reporter_id: Set(caller.user_id),
            target_type: Set(new.target_type),
            target_id: Set(new.target_id),
            reason: Set(new.reason),
            description: Set(description),
            evidence: Set(Evidence(new.evidence)),
            priority: Set(priority),
            status: Set(ReportStatus::Pending),
            moderator_id: Set(None),
            moderator_notes: Set(None),
            action: Set(ActionKind::None),
            action_taken_at: Set(None),
            action_expires_at: Set(None),
            target_data: Set(snapshot),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let txn = self.db.begin().await?;
        let saved = model.insert(&txn).await.map_err(map_insert_error)?;
        let records = notification::record_report_submitted(&txn, &saved).await;
        txn.commit().await?;

        tracing::info!(
            report_id = saved.id,
            reporter_id = saved.reporter_id,
            target_type = saved.target_type.as_str(),
            target_id = saved.target_id,
            reason = saved.reason.as_str(),
            accuracy = record.accuracy,
            priority = ?saved.priority,
            "Report submitted"
        );

        self.notifications.deliver(&records);
        Ok(saved)
    }

    /// Staff see the whole queue; anyone else only their own reports.
    /// High priority first, then newest first.
    pub async fn list_reports(
        &self,
        caller: AuthUser,
        filter: ReportFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ReportModel>, u64)> {
        let mut query = Report::find();

        if !caller.is_staff() {
            query = query.filter(report::Column::ReporterId.eq(caller.user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(report::Column::Status.eq(status));
        }
        if let Some(target_type) = filter.target_type {
            query = query.filter(report::Column::TargetType.eq(target_type));
        }
        if let Some(reason) = filter.reason {
            query = query.filter(report::Column::Reason.eq(reason));
        }
        if let Some(moderator_id) = filter.moderator_id {
            query = query.filter(report::Column::ModeratorId.eq(moderator_id));
        }

        let paginator = query
            .order_by(
                Expr::cust("CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END"),
                Order::Asc,
            )
            .order_by_desc(report::Column::CreatedAt)
            .order_by_desc(report::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let reports = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((reports, total))
    }

    pub async fn get_report(&self, caller: AuthUser, id: i32) -> AppResult<ReportModel> {
        let report = Report::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        if !caller.is_staff() && report.reporter_id != caller.user_id {
            return Err(AppError::Forbidden);
        }
        Ok(report)
    }

    /// Moderator write on a report: status, notes and optionally an
    /// enforcement action.
    ///
    /// Validation, the transition check and action planning all happen
    /// before anything is written. The report write is a compare-and-swap on
    /// `version`. If the executor then fails, the metadata write and the
    /// resolution notice still commit and the executor error is returned.
    pub async fn update_report(
        &self,
        caller: AuthUser,
        id: i32,
        changes: ReportChanges,
    ) -> AppResult<ReportUpdate> {
        caller.require_staff()?;

        let requested_action = changes.action.filter(|a| *a != ActionKind::None);
        if changes.action_duration.is_some() && requested_action.is_none() {
            return Err(AppError::Validation(
                "action_duration requires an action".to_string(),
            ));
        }

        let existing = Report::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let next_status = report_state::next_status(existing.status, changes.status)?;

        let plan = match requested_action {
            Some(_) if existing.action != ActionKind::None => {
                return Err(AppError::Conflict(format!(
                    "Report {} already has action {}",
                    id,
                    existing.action.as_str()
                )));
            }
            Some(action) => Some(
                moderation::plan(
                    &self.db,
                    action,
                    existing.target_type,
                    existing.target_id,
                    changes.action_duration,
                    &self.config,
                )
                .await?,
            ),
            None => None,
        };

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let written = Report::update_many()
            .set(report::ActiveModel {
                status: Set(next_status),
                moderator_id: Set(Some(caller.user_id)),
                moderator_notes: match &changes.moderator_notes {
                    Some(notes) => Set(Some(notes.clone())),
                    None => NotSet,
                },
                updated_at: Set(now),
                ..Default::default()
            })
            .col_expr(
                report::Column::Version,
                Expr::col(report::Column::Version).add(1),
            )
            .filter(report::Column::Id.eq(id))
            .filter(report::Column::Version.eq(existing.version))
            .exec(&txn)
            .await?;
        if written.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Report {} was modified concurrently, reload and retry",
                id
            )));
        }

        let outcome = match plan {
            Some(plan) => {
                let ctx = ActionContext {
                    moderator_id: caller.user_id,
                    reason: existing.reason.as_str().to_string(),
                    notes: changes.moderator_notes.clone(),
                    report_id: Some(id),
                };
                Some(moderation::execute(&txn, &plan, &ctx).await)
            }
            None => None,
        };

        if let Some(Ok(applied)) = &outcome {
            Report::update_many()
                .set(report::ActiveModel {
                    action: Set(applied.action.action_type),
                    action_taken_at: Set(Some(applied.action.created_at)),
                    action_expires_at: Set(applied.action.expires_at),
                    ..Default::default()
                })
                .filter(report::Column::Id.eq(id))
                .exec(&txn)
                .await?;
        }

        let updated = Report::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let records = if report_state::closes(existing.status, updated.status) {
            notification::record_report_resolved(&txn, &updated, caller.user_id).await
        } else {
            Vec::new()
        };

        txn.commit().await?;
        self.notifications.deliver(&records);

        tracing::info!(
            report_id = id,
            moderator_id = caller.user_id,
            from = existing.status.as_str(),
            to = updated.status.as_str(),
            action = updated.action.as_str(),
            "Report updated"
        );

        let action = match outcome {
            Some(Ok(applied)) => Some(applied),
            Some(Err(e)) => {
                tracing::warn!(report_id = id, "Action executor failed: {}", e);
                return Err(e);
            }
            None => None,
        };

        Ok(ReportUpdate {
            report: updated,
            action,
        })
    }

    /// Only pending reports can be withdrawn, by an admin or the reporter.
    pub async fn delete_report(&self, caller: AuthUser, id: i32) -> AppResult<()> {
        let existing = Report::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        if !caller.is_admin() && existing.reporter_id != caller.user_id {
            return Err(AppError::Forbidden);
        }
        if existing.status != ReportStatus::Pending {
            return Err(AppError::Conflict(
                "Only pending reports can be deleted".to_string(),
            ));
        }

        let result = Report::delete_many()
            .filter(report::Column::Id.eq(id))
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Only pending reports can be deleted".to_string(),
            ));
        }

        tracing::info!(report_id = id, deleted_by = caller.user_id, "Report deleted");
        Ok(())
    }

    pub async fn report_stats(&self, caller: AuthUser) -> AppResult<ReportStats> {
        caller.require_staff()?;

        let rows: Vec<(ReportStatus, i64)> = Report::find()
            .select_only()
            .column(report::Column::Status)
            .column_as(report::Column::Id.count(), "count")
            .group_by(report::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut stats = ReportStats::default();
        for (status, count) in rows {
            let count = count.max(0) as u64;
            stats.total += count;
            match status {
                ReportStatus::Pending => stats.pending = count,
                ReportStatus::Investigating => stats.investigating = count,
                ReportStatus::Resolved => stats.resolved = count,
                ReportStatus::Dismissed => stats.dismissed = count,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_report(evidence: Vec<&str>) -> NewReport {
        NewReport {
            target_type: TargetKind::Post,
            target_id: 7,
            reason: ReportReason::Spam,
            description: None,
            evidence: evidence.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn accepts_web_evidence() {
        let report = new_report(vec!["https://example.com/a.png", "http://cdn.example.org/x"]);
        assert!(validate_new_report(1, &report, &ModerationConfig::default()).is_ok());
    }

    #[test]
    fn rejects_non_web_evidence() {
        for url in ["ftp://example.com/a", "javascript:alert(1)", "https://", "https:///path", "https://a b"] {
            let report = new_report(vec![url]);
            assert!(
                validate_new_report(1, &report, &ModerationConfig::default()).is_err(),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn evidence_limits() {
        let cfg = ModerationConfig::default();
        let many = vec!["https://example.com/x"; cfg.max_evidence + 1];
        assert!(validate_new_report(1, &new_report(many), &cfg).is_err());

        let long = format!("https://example.com/{}", "a".repeat(MAX_EVIDENCE_URL_LEN));
        let report = NewReport {
            evidence: vec![long],
            ..new_report(vec![])
        };
        assert!(validate_new_report(1, &report, &cfg).is_err());
    }

    #[test]
    fn description_is_measured_in_characters() {
        let cfg = ModerationConfig {
            description_max: 3,
            ..Default::default()
        };
        let ok = NewReport {
            description: Some("äöü".to_string()),
            ..new_report(vec![])
        };
        assert!(validate_new_report(1, &ok, &cfg).is_ok());

        let too_long = NewReport {
            description: Some("abcd".to_string()),
            ..new_report(vec![])
        };
        assert!(validate_new_report(1, &too_long, &cfg).is_err());
    }

    #[test]
    fn self_report_is_rejected() {
        let report = NewReport {
            target_type: TargetKind::User,
            target_id: 1,
            ..new_report(vec![])
        };
        assert!(matches!(
            validate_new_report(1, &report, &ModerationConfig::default()),
            Err(AppError::Validation(_))
        ));
        assert!(validate_new_report(2, &report, &ModerationConfig::default()).is_ok());
    }
}
