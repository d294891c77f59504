use crate::{
    context::CallerContext,
    error::{AppError, AppResult},
    models::{
        moderation_action, ActionType, AppealStatus, Capability, ContentRef, EffectState,
        ModerationAction, ModerationActionModel, User,
    },
    services::{
        content::ContentService,
        effects::{self, EffectApplier},
    },
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, SqlErr,
};
use std::time::Duration;

/// Input of [`LedgerService::record_action`].
#[derive(Debug, Clone)]
pub struct RecordAction {
    pub user_id: Option<i32>,
    pub action_type: ActionType,
    pub reason: String,
    pub report_id: Option<i32>,
    pub content: Option<ContentRef>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerFilter {
    pub user_id: Option<i32>,
    pub action_type: Option<ActionType>,
}

pub struct LedgerService {
    db: DatabaseConnection,
}

impl LedgerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: i32) -> AppResult<ModerationActionModel> {
        ModerationAction::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Capability checks for issuing `action_type`; runs before any write.
    pub fn authorize(caller: &CallerContext, action_type: ActionType) -> AppResult<()> {
        match action_type.extra_capability() {
            Some(extra) => caller.require_all(&[Capability::Moderate, extra]),
            None => caller.require(Capability::Moderate),
        }
    }

    /// Record a moderation decision and apply its side effect.
    ///
    /// The row is written as `pending` first, the effect is applied, then the
    /// row is committed. A failed effect compensates the row to `aborted`.
    pub async fn record_action(
        &self,
        caller: &CallerContext,
        cmd: RecordAction,
    ) -> AppResult<ModerationActionModel> {
        Self::authorize(caller, cmd.action_type)?;

        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("reason is required".to_string()));
        }

        // Content actions notify the owner when no subject is given.
        let user_id = match cmd.content {
            Some(content) => {
                let owner = ContentService::new(self.db.clone())
                    .owner_of(content)
                    .await?;
                cmd.user_id.or(owner)
            }
            None => cmd.user_id,
        };

        let effect = effects::forward(cmd.action_type, user_id, cmd.content, reason)?;

        if let Some(uid) = user_id {
            User::find_by_id(uid)
                .one(&self.db)
                .await?
                .ok_or(AppError::NotFound)?;
        }

        let now = chrono::Utc::now().naive_utc();
        let suspension_until = cmd.action_type.suspension_duration().map(|d| now + d);

        let pending = moderation_action::ActiveModel {
            user_id: Set(user_id),
            moderator_id: Set(caller.user_id),
            action_type: Set(cmd.action_type),
            reason: Set(reason.to_string()),
            report_id: Set(cmd.report_id),
            content_type: Set(cmd.content.map(|c| c.content_type)),
            content_id: Set(cmd.content.map(|c| c.content_id)),
            suspension_until: Set(suspension_until),
            user_notified: Set(false),
            user_notified_at: Set(None),
            appeal_status: Set(AppealStatus::None),
            appeal_text: Set(None),
            appeal_submitted_at: Set(None),
            appeal_response: Set(None),
            appeal_resolved_at: Set(None),
            appeal_resolved_by: Set(None),
            effect_state: Set(EffectState::Pending),
            version: Set(1),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("the report already has an action".to_string())
            }
            _ => AppError::Database(err),
        })?;

        if let Err(err) = EffectApplier::new(self.db.clone()).apply(&effect).await {
            tracing::error!(
                "Effect of action {} ({:?}) failed: {}",
                pending.id,
                pending.action_type,
                err
            );
            if let Err(comp_err) = self
                .transition(pending.id, EffectState::Pending, EffectState::Aborted)
                .await
            {
                tracing::error!(
                    "Could not abort action {}, left pending for reconciliation: {}",
                    pending.id,
                    comp_err
                );
            }
            return Err(err);
        }

        self.transition(pending.id, EffectState::Pending, EffectState::Committed)
            .await?;

        tracing::info!(
            "Moderator {} recorded {:?} (action {}, user {:?}, content {:?}, report {:?})",
            caller.user_id,
            pending.action_type,
            pending.id,
            pending.user_id,
            cmd.content,
            pending.report_id
        );

        Ok(ModerationActionModel {
            effect_state: EffectState::Committed,
            ..pending
        })
    }

    /// Move `id` from `from` to `to`. Returns whether this call made the move.
    pub(crate) async fn transition(
        &self,
        id: i32,
        from: EffectState,
        to: EffectState,
    ) -> AppResult<bool> {
        let result = ModerationAction::update_many()
            .set(moderation_action::ActiveModel {
                effect_state: Set(to),
                ..Default::default()
            })
            .filter(moderation_action::Column::Id.eq(id))
            .filter(moderation_action::Column::EffectState.eq(from))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Conditional write on `current.version`; bumps the version.
    pub(crate) async fn write_versioned(
        &self,
        current: &ModerationActionModel,
        mut changes: moderation_action::ActiveModel,
    ) -> AppResult<ModerationActionModel> {
        changes.version = Set(current.version + 1);
        let result = ModerationAction::update_many()
            .set(changes)
            .filter(moderation_action::Column::Id.eq(current.id))
            .filter(moderation_action::Column::Version.eq(current.version))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::version_conflict("moderation action", current.id));
        }
        self.get(current.id).await
    }

    pub async fn list(
        &self,
        caller: &CallerContext,
        filter: LedgerFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ModerationActionModel>, u64)> {
        caller.require(Capability::ViewReports)?;

        let mut query = ModerationAction::find();
        if let Some(uid) = filter.user_id {
            query = query.filter(moderation_action::Column::UserId.eq(uid));
        }
        if let Some(t) = filter.action_type {
            query = query.filter(moderation_action::Column::ActionType.eq(t));
        }

        let paginator = query
            .order_by_desc(moderation_action::Column::CreatedAt)
            .order_by_desc(moderation_action::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let actions = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((actions, total))
    }

    pub async fn get_for_console(
        &self,
        caller: &CallerContext,
        id: i32,
    ) -> AppResult<ModerationActionModel> {
        caller.require(Capability::ViewReports)?;
        self.get(id).await
    }

    /// A member's own history; in-flight and aborted entries are hidden.
    pub async fn list_mine(
        &self,
        caller: &CallerContext,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ModerationActionModel>, u64)> {
        let paginator = ModerationAction::find()
            .filter(moderation_action::Column::UserId.eq(caller.user_id))
            .filter(moderation_action::Column::EffectState.is_in(EffectState::DELIVERABLE))
            .order_by_desc(moderation_action::Column::CreatedAt)
            .order_by_desc(moderation_action::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let actions = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((actions, total))
    }

    /// Entries that carry an appeal, most recently submitted first.
    pub async fn list_appeals(
        &self,
        caller: &CallerContext,
        status: Option<AppealStatus>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ModerationActionModel>, u64)> {
        caller.require(Capability::ViewReports)?;

        let mut query =
            ModerationAction::find().filter(moderation_action::Column::AppealText.is_not_null());
        if let Some(s) = status {
            query = query.filter(moderation_action::Column::AppealStatus.eq(s));
        }

        let paginator = query
            .order_by_desc(moderation_action::Column::AppealSubmittedAt)
            .order_by_desc(moderation_action::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let actions = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((actions, total))
    }

    /// Roll stranded `pending` entries forward. Entries whose target vanished
    /// are aborted.
    pub async fn reconcile_pending(&self, grace: Duration) -> AppResult<usize> {
        let cutoff = chrono::Utc::now().naive_utc()
            - chrono::TimeDelta::from_std(grace).unwrap_or(chrono::TimeDelta::zero());

        let stranded = ModerationAction::find()
            .filter(moderation_action::Column::EffectState.eq(EffectState::Pending))
            .filter(moderation_action::Column::CreatedAt.lt(cutoff))
            .order_by_asc(moderation_action::Column::Id)
            .all(&self.db)
            .await?;

        let applier = EffectApplier::new(self.db.clone());
        let mut settled = 0;
        for action in stranded {
            let effect = match effects::forward(
                action.action_type,
                action.user_id,
                action.content_ref(),
                &action.reason,
            ) {
                Ok(effect) => effect,
                Err(err) => {
                    tracing::warn!("Action {} cannot be replayed: {}", action.id, err);
                    self.transition(action.id, EffectState::Pending, EffectState::Aborted)
                        .await?;
                    settled += 1;
                    continue;
                }
            };

            match applier.apply(&effect).await {
                Ok(()) => {
                    if self
                        .transition(action.id, EffectState::Pending, EffectState::Committed)
                        .await?
                    {
                        tracing::info!("Reconciled action {} to committed", action.id);
                        settled += 1;
                    }
                }
                Err(AppError::NotFound) => {
                    tracing::warn!("Target of action {} is gone, aborting", action.id);
                    self.transition(action.id, EffectState::Pending, EffectState::Aborted)
                        .await?;
                    settled += 1;
                }
                Err(err) => {
                    tracing::error!("Replaying action {} failed: {}", action.id, err);
                }
            }
        }
        Ok(settled)
    }

    /// Retry reversals of approved appeals that did not complete.
    pub async fn retry_reversals(&self) -> AppResult<usize> {
        let stuck = ModerationAction::find()
            .filter(moderation_action::Column::EffectState.eq(EffectState::ReversalPending))
            .order_by_asc(moderation_action::Column::Id)
            .all(&self.db)
            .await?;

        let applier = EffectApplier::new(self.db.clone());
        let mut done = 0;
        for action in stuck {
            match applier.apply(&effects::reversal(&action)).await {
                Ok(()) => {
                    if self
                        .transition(
                            action.id,
                            EffectState::ReversalPending,
                            EffectState::Reversed,
                        )
                        .await?
                    {
                        tracing::info!("Reversal of action {} completed on retry", action.id);
                        done += 1;
                    }
                }
                Err(err) => {
                    tracing::error!("Reversal of action {} failed again: {}", action.id, err);
                }
            }
        }
        Ok(done)
    }
}
