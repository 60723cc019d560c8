use super::enums::UserRole;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub role: UserRole,
    pub is_banned: bool,
    pub banned_until: Option<DateTime>,
    #[sea_orm(column_type = "Text", nullable)]
    pub ban_reason: Option<String>,
    pub created_at: DateTime,
}

impl Model {
    /// A ban holds while flagged and either permanent or not yet expired.
    pub fn is_banned_at(&self, now: DateTime) -> bool {
        self.is_banned && self.banned_until.map_or(true, |until| until > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
