pub mod admin;
pub mod moderation;
pub mod notice;
pub mod report;
