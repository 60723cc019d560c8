use super::enums::{ActionKind, TargetKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit record of an enforcement decision. Written before the target is
/// touched so it outlives a failed mutation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moderation_actions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub action_type: ActionKind,
    pub target_type: TargetKind,
    pub target_id: i32,
    /// User the enforcement landed on (the author for content bans).
    pub subject_user_id: Option<i32>,
    pub report_id: Option<i32>,
    pub moderator_id: i32,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub expires_at: Option<DateTime>,
    pub is_active: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ModeratorId",
        to = "super::user::Column::Id"
    )]
    Moderator,
    #[sea_orm(
        belongs_to = "super::report::Entity",
        from = "Column::ReportId",
        to = "super::report::Column::Id"
    )]
    Report,
}

impl ActiveModelBehavior for ActiveModel {}
