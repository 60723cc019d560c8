use super::enums::{ActionKind, NotificationKind, Priority, ReportReason, ReportStatus, TargetKind};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub kind: NotificationKind,
    #[sea_orm(column_type = "Json")]
    pub payload: NotificationPayload,
    pub is_read: bool,
    pub created_at: DateTime,
}

/// Deep-link data carried by a notification, one shape per kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    ReportSubmitted {
        report_id: i32,
        target_type: TargetKind,
        target_id: i32,
        reason: ReportReason,
        priority: Priority,
    },
    ReportResolved {
        report_id: i32,
        target_type: TargetKind,
        target_id: i32,
        status: ReportStatus,
        action: ActionKind,
    },
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationPayload::ReportSubmitted { .. } => NotificationKind::ReportSubmitted,
            NotificationPayload::ReportResolved { .. } => NotificationKind::ReportResolved,
        }
    }

    pub fn report_id(&self) -> i32 {
        match self {
            NotificationPayload::ReportSubmitted { report_id, .. }
            | NotificationPayload::ReportResolved { report_id, .. } => *report_id,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
