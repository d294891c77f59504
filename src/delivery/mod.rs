//! Delivery of moderation notices to the affected user.
//!
//! Server side, [`tracker::DeliveryTracker`] keeps the per-user presentation
//! cursor. Client side, [`poller::NotificationPoller`] pulls pending notices
//! and presents them one at a time.

pub mod poller;
pub mod tracker;

use crate::models::{ActionType, AppealStatus, ContentRef, ModerationActionModel};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the user is shown about a ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub id: i32,
    pub action_type: ActionType,
    pub title: String,
    pub reason: String,
    pub content: Option<ContentRef>,
    pub suspension_until: Option<String>,
    pub appeal_status: AppealStatus,
    pub appeal_response: Option<String>,
    pub can_appeal: bool,
    pub created_at: String,
}

impl From<ModerationActionModel> for Notice {
    fn from(a: ModerationActionModel) -> Self {
        Self {
            id: a.id,
            action_type: a.action_type,
            title: a.action_type.title().to_string(),
            content: a.content_ref(),
            suspension_until: a.suspension_until.map(|t| t.to_string()),
            appeal_status: a.appeal_status,
            can_appeal: a.can_appeal(),
            created_at: a.created_at.to_string(),
            appeal_response: a.appeal_response,
            reason: a.reason,
        }
    }
}
