use super::enums::{ActionKind, Priority, ReportReason, ReportStatus, TargetKind};
use super::snapshot::{Evidence, TargetSnapshot};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub reporter_id: i32,
    pub target_type: TargetKind,
    pub target_id: i32,
    pub reason: ReportReason,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub evidence: Evidence,
    pub priority: Priority,
    pub status: ReportStatus,
    pub moderator_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub moderator_notes: Option<String>,
    pub action: ActionKind,
    pub action_taken_at: Option<DateTime>,
    pub action_expires_at: Option<DateTime>,
    #[sea_orm(column_type = "Json")]
    pub target_data: TargetSnapshot,
    /// Bumped on every moderator write; guards concurrent updates.
    pub version: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReporterId",
        to = "super::user::Column::Id"
    )]
    Reporter,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ModeratorId",
        to = "super::user::Column::Id"
    )]
    Moderator,
}

impl ActiveModelBehavior for ActiveModel {}
