pub mod moderation;
pub mod notification;
pub mod report;
