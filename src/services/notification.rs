use crate::{
    error::{AppError, AppResult},
    models::{
        notification, user, Notification, NotificationModel, NotificationPayload, ReportModel,
        User, UserRole,
    },
    websocket::hub::NotificationHub,
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};

pub struct NotificationService {
    db: DatabaseConnection,
    hub: NotificationHub,
}

/// Record the intake fanout: every moderator and admin except the reporter.
///
/// Runs in a savepoint of `txn`. A failure is logged and yields no records;
/// the surrounding state change still commits.
pub async fn record_report_submitted(
    txn: &DatabaseTransaction,
    report: &ReportModel,
) -> Vec<NotificationModel> {
    let payload = NotificationPayload::ReportSubmitted {
        report_id: report.id,
        target_type: report.target_type,
        target_id: report.target_id,
        reason: report.reason,
        priority: report.priority,
    };
    record_guarded(txn, payload, Recipients::Staff {
        except: report.reporter_id,
    })
    .await
}

/// Record the resolution notice for the original reporter, unless the
/// reporter is the one closing the report.
pub async fn record_report_resolved(
    txn: &DatabaseTransaction,
    report: &ReportModel,
    actor_id: i32,
) -> Vec<NotificationModel> {
    if report.reporter_id == actor_id {
        return Vec::new();
    }
    let payload = NotificationPayload::ReportResolved {
        report_id: report.id,
        target_type: report.target_type,
        target_id: report.target_id,
        status: report.status,
        action: report.action,
    };
    record_guarded(txn, payload, Recipients::User(report.reporter_id)).await
}

enum Recipients {
    User(i32),
    Staff { except: i32 },
}

async fn record_guarded(
    txn: &DatabaseTransaction,
    payload: NotificationPayload,
    recipients: Recipients,
) -> Vec<NotificationModel> {
    let report_id = payload.report_id();
    let kind = payload.kind();
    match record_in_savepoint(txn, payload, recipients).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(
                report_id,
                kind = ?kind,
                "Failed to record notifications: {}",
                e
            );
            Vec::new()
        }
    }
}

async fn record_in_savepoint(
    txn: &DatabaseTransaction,
    payload: NotificationPayload,
    recipients: Recipients,
) -> Result<Vec<NotificationModel>, DbErr> {
    let savepoint = txn.begin().await?;
    match insert_for(&savepoint, payload, recipients).await {
        Ok(records) => {
            savepoint.commit().await?;
            Ok(records)
        }
        Err(e) => {
            savepoint.rollback().await?;
            Err(e)
        }
    }
}

async fn insert_for<C: ConnectionTrait>(
    db: &C,
    payload: NotificationPayload,
    recipients: Recipients,
) -> Result<Vec<NotificationModel>, DbErr> {
    let user_ids: Vec<i32> = match recipients {
        Recipients::User(id) => vec![id],
        Recipients::Staff { except } => {
            User::find()
                .select_only()
                .column(user::Column::Id)
                .filter(user::Column::Role.is_in([UserRole::Moderator, UserRole::Admin]))
                .filter(user::Column::Id.ne(except))
                .order_by_asc(user::Column::Id)
                .into_tuple()
                .all(db)
                .await?
        }
    };

    let now = chrono::Utc::now().naive_utc();
    let mut records = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        let model = notification::ActiveModel {
            user_id: Set(user_id),
            kind: Set(payload.kind()),
            payload: Set(payload.clone()),
            is_read: Set(false),
            created_at: Set(now),
            ..Default::default()
        };
        records.push(model.insert(db).await?);
    }
    Ok(records)
}

impl NotificationService {
    pub fn new(db: DatabaseConnection, hub: NotificationHub) -> Self {
        Self { db, hub }
    }

    /// Push committed records to whoever is connected. Offline recipients
    /// read them from the list endpoint.
    pub fn deliver(&self, records: &[NotificationModel]) {
        for record in records {
            let sockets = self.hub.publish(record.user_id, "notification", record);
            tracing::debug!(
                notification_id = record.id,
                user_id = record.user_id,
                sockets,
                "Notification pushed"
            );
        }
    }

    pub async fn list_for_user(
        &self,
        user_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<NotificationModel>, u64)> {
        let paginator = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    pub async fn unread_count(&self, user_id: i32) -> AppResult<u64> {
        let count = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<()> {
        let existing = Notification::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        if existing.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        let mut active: notification::ActiveModel = existing.into();
        active.is_read = Set(true);
        active.update(&self.db).await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
