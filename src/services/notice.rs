use crate::{
    context::CallerContext,
    delivery::tracker::DeliveryTracker,
    error::{AppError, AppResult},
    models::{moderation_action, EffectState, ModerationAction, ModerationActionModel},
};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::time::Duration;

/// Result of asking for the next notice to present.
#[derive(Debug)]
pub enum NextNotice {
    Show(ModerationActionModel),
    Wait(Duration),
    Empty,
}

pub struct NoticeService {
    db: DatabaseConnection,
}

impl NoticeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Undelivered entries for `user_id`, newest first.
    pub async fn fetch_pending(&self, user_id: i32) -> AppResult<Vec<ModerationActionModel>> {
        let pending = ModerationAction::find()
            .filter(moderation_action::Column::UserId.eq(user_id))
            .filter(moderation_action::Column::UserNotified.eq(false))
            .filter(moderation_action::Column::EffectState.is_in(EffectState::DELIVERABLE))
            .order_by_desc(moderation_action::Column::CreatedAt)
            .order_by_desc(moderation_action::Column::Id)
            .all(&self.db)
            .await?;
        Ok(pending)
    }

    pub async fn next(
        &self,
        caller: &CallerContext,
        tracker: &DeliveryTracker,
    ) -> AppResult<NextNotice> {
        if let Some(wait) = tracker.retry_after(caller.user_id) {
            return Ok(NextNotice::Wait(wait));
        }

        let pending = self.fetch_pending(caller.user_id).await?;

        if let Some(current) = tracker.current(caller.user_id) {
            if let Some(notice) = pending.iter().find(|a| a.id == current) {
                return Ok(NextNotice::Show(notice.clone()));
            }
        }

        match pending.into_iter().next() {
            Some(notice) => {
                tracker.show(caller.user_id, notice.id);
                Ok(NextNotice::Show(notice))
            }
            None => {
                tracker.clear(caller.user_id);
                Ok(NextNotice::Empty)
            }
        }
    }

    /// Mark a notice delivered. Acknowledging twice is a no-op.
    pub async fn acknowledge(
        &self,
        caller: &CallerContext,
        action_id: i32,
    ) -> AppResult<ModerationActionModel> {
        let existing = ModerationAction::find_by_id(action_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        if existing.user_id != Some(caller.user_id) {
            return Err(AppError::Forbidden);
        }
        if existing.user_notified {
            return Ok(existing);
        }
        if !existing.effect_state.is_deliverable() {
            return Err(AppError::InvalidState(
                "the action has not taken effect".to_string(),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        ModerationAction::update_many()
            .set(moderation_action::ActiveModel {
                user_notified: Set(true),
                user_notified_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(moderation_action::Column::Id.eq(action_id))
            .filter(moderation_action::Column::UserNotified.eq(false))
            .exec(&self.db)
            .await?;

        tracing::info!("User {} acknowledged action {}", caller.user_id, action_id);

        ModerationAction::find_by_id(action_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}
