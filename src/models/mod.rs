pub mod admin_user;
pub mod comment;
pub mod content;
pub mod moderation_action;
pub mod post;
pub mod report;
pub mod user;

pub use admin_user::{
    Capability, Entity as AdminUser, Model as AdminUserModel, Permissions, StaffRole,
};
pub use comment::{Entity as Comment, Model as CommentModel};
pub use content::{ContentRef, ContentType};
pub use moderation_action::{
    ActionType, AppealDecision, AppealStatus, EffectState, Entity as ModerationAction,
    Model as ModerationActionModel,
};
pub use post::{Entity as Post, Model as PostModel};
pub use report::{
    Entity as Report, Model as ReportModel, ReportCategory, ReportPriority, ReportStatus,
};
pub use user::{AccountStatus, Entity as User, Model as UserModel};

use crate::error::{AppError, AppResult};
use sea_orm::ActiveEnum;

/// Parse a request string into one of the string-backed column enums.
pub fn parse_enum<E>(raw: &str, what: &str) -> AppResult<E>
where
    E: ActiveEnum<Value = String>,
{
    E::try_from_value(&raw.trim().to_ascii_lowercase())
        .map_err(|_| AppError::Validation(format!("invalid {}: '{}'", what, raw)))
}
