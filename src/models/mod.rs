pub mod comment;
pub mod conversation;
pub mod enums;
pub mod message;
pub mod moderation_action;
pub mod notification;
pub mod post;
pub mod report;
pub mod snapshot;
pub mod user;

pub use comment::{Entity as Comment, Model as CommentModel};
pub use conversation::{Entity as Conversation, Model as ConversationModel};
pub use enums::{
    ActionKind, NotificationKind, Priority, ReportReason, ReportStatus, TargetKind, UserRole,
};
pub use message::{Entity as Message, Model as MessageModel};
pub use moderation_action::{Entity as ModerationAction, Model as ModerationActionModel};
pub use notification::{Entity as Notification, Model as NotificationModel, NotificationPayload};
pub use post::{Entity as Post, Model as PostModel};
pub use report::{Entity as Report, Model as ReportModel};
pub use snapshot::{Evidence, TargetSnapshot};
pub use user::{Entity as User, Model as UserModel};
