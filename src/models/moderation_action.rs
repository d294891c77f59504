use super::admin_user::Capability;
use super::content::{ContentRef, ContentType};
use crate::error::{AppError, AppResult};
use chrono::TimeDelta;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(40))")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "suspension_24h")]
    #[serde(rename = "suspension_24h")]
    Suspension24h,
    #[sea_orm(string_value = "suspension_7d")]
    #[serde(rename = "suspension_7d")]
    Suspension7d,
    #[sea_orm(string_value = "suspension_30d")]
    #[serde(rename = "suspension_30d")]
    Suspension30d,
    #[sea_orm(string_value = "ban")]
    Ban,
    #[sea_orm(string_value = "content_shadowban")]
    ContentShadowban,
    #[sea_orm(string_value = "content_deleted")]
    ContentDeleted,
    #[sea_orm(string_value = "content_deleted_permanent")]
    ContentDeletedPermanent,
    #[sea_orm(string_value = "content_restored")]
    ContentRestored,
}

impl ActionType {
    pub const SUSPENSIONS: [ActionType; 3] = [
        ActionType::Suspension24h,
        ActionType::Suspension7d,
        ActionType::Suspension30d,
    ];

    pub fn parse(raw: &str) -> AppResult<Self> {
        Self::try_from_value(&raw.trim().to_ascii_lowercase())
            .map_err(|_| AppError::invalid_action_type(raw))
    }

    /// Length of the suspension; `None` for every non-suspension action.
    pub fn suspension_duration(self) -> Option<TimeDelta> {
        match self {
            ActionType::Suspension24h => Some(TimeDelta::hours(24)),
            ActionType::Suspension7d => Some(TimeDelta::days(7)),
            ActionType::Suspension30d => Some(TimeDelta::days(30)),
            _ => None,
        }
    }

    pub fn is_suspension(self) -> bool {
        self.suspension_duration().is_some()
    }

    /// Suspensions and bans change `account_status`.
    pub fn restricts_account(self) -> bool {
        self.is_suspension() || self == ActionType::Ban
    }

    /// Warnings, suspensions and bans are aimed at a person and need a target user.
    pub fn targets_user(self) -> bool {
        self == ActionType::Warning || self.restricts_account()
    }

    /// Content actions need a content reference.
    pub fn targets_content(self) -> bool {
        !self.targets_user()
    }

    /// Capabilities required on top of `Moderate`.
    pub fn extra_capability(self) -> Option<Capability> {
        if self.restricts_account() {
            Some(Capability::Ban)
        } else if matches!(
            self,
            ActionType::ContentDeleted | ActionType::ContentDeletedPermanent
        ) {
            Some(Capability::DeleteContent)
        } else {
            None
        }
    }

    /// Action types a moderator may pick when closing a report.
    pub fn allowed_from_report(self) -> bool {
        !matches!(
            self,
            ActionType::ContentRestored | ActionType::ContentDeletedPermanent
        )
    }

    pub fn is_appealable(self) -> bool {
        self != ActionType::ContentRestored
    }

    pub fn title(self) -> &'static str {
        match self {
            ActionType::Warning => "Warning",
            ActionType::Suspension24h => "24-hour suspension",
            ActionType::Suspension7d => "7-day suspension",
            ActionType::Suspension30d => "30-day suspension",
            ActionType::Ban => "Account banned",
            ActionType::ContentShadowban => "Content hidden",
            ActionType::ContentDeleted => "Content removed",
            ActionType::ContentDeletedPermanent => "Content permanently deleted",
            ActionType::ContentRestored => "Content restored",
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl AppealStatus {
    /// `none -> pending` is the only way in.
    pub fn ensure_can_submit(self) -> AppResult<()> {
        match self {
            AppealStatus::None => Ok(()),
            AppealStatus::Pending => Err(AppError::InvalidState(
                "an appeal is already pending for this action".to_string(),
            )),
            AppealStatus::Approved | AppealStatus::Rejected => Err(AppError::InvalidState(
                "the appeal for this action has already been decided".to_string(),
            )),
        }
    }

    pub fn ensure_can_resolve(self) -> AppResult<()> {
        if self == AppealStatus::Pending {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "appeal is {:?}, only pending appeals can be resolved",
                self
            )))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppealDecision {
    Approved,
    Rejected,
}

impl AppealDecision {
    pub fn status(self) -> AppealStatus {
        match self {
            AppealDecision::Approved => AppealStatus::Approved,
            AppealDecision::Rejected => AppealStatus::Rejected,
        }
    }

    pub fn canned_response(self) -> &'static str {
        match self {
            AppealDecision::Approved => {
                "Your appeal has been accepted. The action has been reversed."
            }
            AppealDecision::Rejected => "Your appeal was reviewed but not upheld.",
        }
    }
}

/// Progress of the ledger-entry/side-effect pair.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum EffectState {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "committed")]
    Committed,
    #[sea_orm(string_value = "aborted")]
    Aborted,
    #[sea_orm(string_value = "reversal_pending")]
    ReversalPending,
    #[sea_orm(string_value = "reversed")]
    Reversed,
}

impl EffectState {
    pub const DELIVERABLE: [EffectState; 3] = [
        EffectState::Committed,
        EffectState::ReversalPending,
        EffectState::Reversed,
    ];

    /// The action took effect, so the subject may be told about it.
    pub fn is_deliverable(self) -> bool {
        Self::DELIVERABLE.contains(&self)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moderation_actions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Option<i32>,
    pub moderator_id: i32,
    pub action_type: ActionType,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub report_id: Option<i32>,
    pub content_type: Option<ContentType>,
    pub content_id: Option<i32>,
    pub suspension_until: Option<DateTime>,
    pub user_notified: bool,
    pub user_notified_at: Option<DateTime>,
    pub appeal_status: AppealStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub appeal_text: Option<String>,
    pub appeal_submitted_at: Option<DateTime>,
    #[sea_orm(column_type = "Text", nullable)]
    pub appeal_response: Option<String>,
    pub appeal_resolved_at: Option<DateTime>,
    pub appeal_resolved_by: Option<i32>,
    pub effect_state: EffectState,
    pub version: i32,
    pub created_at: DateTime,
}

impl Model {
    pub fn content_ref(&self) -> Option<ContentRef> {
        ContentRef::from_columns(self.content_type, self.content_id)
    }

    /// Checks everything except the appeal text itself.
    pub fn ensure_appealable_by(&self, user_id: i32) -> AppResult<()> {
        if self.user_id != Some(user_id) {
            return Err(AppError::Forbidden);
        }
        if !self.action_type.is_appealable() {
            return Err(AppError::InvalidState(format!(
                "{} actions cannot be appealed",
                self.action_type.title()
            )));
        }
        if self.effect_state != EffectState::Committed
            && self.appeal_status == AppealStatus::None
        {
            return Err(AppError::InvalidState(
                "the action has not taken effect".to_string(),
            ));
        }
        self.appeal_status.ensure_can_submit()
    }

    pub fn can_appeal(&self) -> bool {
        self.action_type.is_appealable()
            && self.effect_state == EffectState::Committed
            && self.appeal_status == AppealStatus::None
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Subject,
    #[sea_orm(
        belongs_to = "super::report::Entity",
        from = "Column::ReportId",
        to = "super::report::Column::Id"
    )]
    Report,
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Report.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action_type: ActionType) -> Model {
        let now = chrono::Utc::now().naive_utc();
        Model {
            id: 1,
            user_id: Some(7),
            moderator_id: 2,
            action_type,
            reason: "spam".to_string(),
            report_id: None,
            content_type: None,
            content_id: None,
            suspension_until: None,
            user_notified: false,
            user_notified_at: None,
            appeal_status: AppealStatus::None,
            appeal_text: None,
            appeal_submitted_at: None,
            appeal_response: None,
            appeal_resolved_at: None,
            appeal_resolved_by: None,
            effect_state: EffectState::Committed,
            version: 1,
            created_at: now,
        }
    }

    #[test]
    fn suspension_durations() {
        assert_eq!(
            ActionType::Suspension24h.suspension_duration(),
            Some(TimeDelta::hours(24))
        );
        assert_eq!(
            ActionType::Suspension30d.suspension_duration(),
            Some(TimeDelta::days(30))
        );
        assert_eq!(ActionType::Ban.suspension_duration(), None);
        assert_eq!(ActionType::Warning.suspension_duration(), None);
    }

    #[test]
    fn ban_family_requires_ban_capability() {
        for t in ActionType::SUSPENSIONS.into_iter().chain([ActionType::Ban]) {
            assert_eq!(t.extra_capability(), Some(Capability::Ban));
        }
        assert_eq!(ActionType::Warning.extra_capability(), None);
        assert_eq!(
            ActionType::ContentDeleted.extra_capability(),
            Some(Capability::DeleteContent)
        );
    }

    #[test]
    fn parse_rejects_unknown_action() {
        assert_eq!(
            ActionType::parse("suspension_7d").unwrap(),
            ActionType::Suspension7d
        );
        let err = ActionType::parse("suspension_1y").unwrap_err();
        assert!(err.to_string().contains("InvalidActionType"));
    }

    #[test]
    fn appeal_transitions_only_flow_forward() {
        assert!(AppealStatus::None.ensure_can_submit().is_ok());
        assert!(AppealStatus::Pending.ensure_can_submit().is_err());
        assert!(AppealStatus::Approved.ensure_can_submit().is_err());
        assert!(AppealStatus::Rejected.ensure_can_submit().is_err());

        assert!(AppealStatus::Pending.ensure_can_resolve().is_ok());
        assert!(AppealStatus::None.ensure_can_resolve().is_err());
        assert!(AppealStatus::Approved.ensure_can_resolve().is_err());
    }

    #[test]
    fn only_the_subject_may_appeal() {
        let a = action(ActionType::Warning);
        assert!(matches!(a.ensure_appealable_by(8), Err(AppError::Forbidden)));
        assert!(a.ensure_appealable_by(7).is_ok());
    }

    #[test]
    fn restorations_and_uncommitted_actions_are_not_appealable() {
        let restored = action(ActionType::ContentRestored);
        assert!(matches!(
            restored.ensure_appealable_by(7),
            Err(AppError::InvalidState(_))
        ));
        assert!(!restored.can_appeal());

        let mut pending = action(ActionType::Ban);
        pending.effect_state = EffectState::Pending;
        assert!(matches!(
            pending.ensure_appealable_by(7),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn terminal_appeal_cannot_be_resubmitted() {
        let mut a = action(ActionType::Suspension7d);
        a.appeal_status = AppealStatus::Rejected;
        assert!(matches!(
            a.ensure_appealable_by(7),
            Err(AppError::InvalidState(_))
        ));
    }
}
