pub mod moderation;
pub mod notification;
pub mod priority;
pub mod reliability;
pub mod report;
pub mod report_state;
pub mod resolver;
