use super::enums::{TargetKind, UserRole};
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Content excerpts stored on a report are capped at this many characters.
pub const EXCERPT_CHARS: usize = 280;

/// Denormalized copy of a report target, frozen when the report is filed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetSnapshot {
    User {
        id: i32,
        username: String,
        role: UserRole,
    },
    Post {
        id: i32,
        author_id: i32,
        title: String,
        excerpt: String,
        is_removed: bool,
    },
    Comment {
        id: i32,
        post_id: i32,
        author_id: i32,
        excerpt: String,
        is_removed: bool,
    },
    Message {
        id: i32,
        conversation_id: i32,
        author_id: Option<i32>,
        excerpt: String,
    },
    Conversation {
        id: i32,
        author_id: Option<i32>,
        title: Option<String>,
    },
}

impl TargetSnapshot {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetSnapshot::User { .. } => TargetKind::User,
            TargetSnapshot::Post { .. } => TargetKind::Post,
            TargetSnapshot::Comment { .. } => TargetKind::Comment,
            TargetSnapshot::Message { .. } => TargetKind::Message,
            TargetSnapshot::Conversation { .. } => TargetKind::Conversation,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            TargetSnapshot::User { id, .. }
            | TargetSnapshot::Post { id, .. }
            | TargetSnapshot::Comment { id, .. }
            | TargetSnapshot::Message { id, .. }
            | TargetSnapshot::Conversation { id, .. } => *id,
        }
    }

    /// The user accountable for the target. A user is their own author.
    pub fn author_id(&self) -> Option<i32> {
        match self {
            TargetSnapshot::User { id, .. } => Some(*id),
            TargetSnapshot::Post { author_id, .. } | TargetSnapshot::Comment { author_id, .. } => {
                Some(*author_id)
            }
            TargetSnapshot::Message { author_id, .. }
            | TargetSnapshot::Conversation { author_id, .. } => *author_id,
        }
    }
}

pub fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Ordered evidence URLs attached to a report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Evidence(pub Vec<String>);
