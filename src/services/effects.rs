//! Side effects of ledger entries on the content store and on accounts.
//!
//! `forward` and `reversal` are pure: they only decide what should happen.
//! [`EffectApplier`] performs it, and every application is idempotent so the
//! reconciler can replay an effect after a partial failure.

use crate::{
    error::{AppError, AppResult},
    models::{
        comment, moderation_action, post, user, AccountStatus, ActionType, Comment, ContentRef,
        ContentType, EffectState, ModerationAction, ModerationActionModel, Post, User, UserModel,
    },
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    HideContent { content: ContentRef, reason: String },
    RestoreContent { content: ContentRef },
    DeleteContent { content: ContentRef },
    RestrictAccount { user_id: i32, status: AccountStatus },
    /// Lift the restriction of `action_id`; the account keeps whatever its
    /// other restrictions still justify.
    ReactivateAccount { user_id: i32, action_id: i32 },
}

fn require_content(action_type: ActionType, content: Option<ContentRef>) -> AppResult<ContentRef> {
    content.ok_or_else(|| {
        AppError::Validation(format!(
            "{} requires a content_type and content_id",
            action_type.title()
        ))
    })
}

fn require_user(action_type: ActionType, user_id: Option<i32>) -> AppResult<i32> {
    user_id.ok_or_else(|| {
        AppError::Validation(format!("{} requires a target user", action_type.title()))
    })
}

/// What recording `action_type` does to the world.
pub fn forward(
    action_type: ActionType,
    user_id: Option<i32>,
    content: Option<ContentRef>,
    reason: &str,
) -> AppResult<Effect> {
    let effect = match action_type {
        ActionType::Warning => {
            require_user(action_type, user_id)?;
            Effect::None
        }
        ActionType::Suspension24h | ActionType::Suspension7d | ActionType::Suspension30d => {
            Effect::RestrictAccount {
                user_id: require_user(action_type, user_id)?,
                status: AccountStatus::Suspended,
            }
        }
        ActionType::Ban => Effect::RestrictAccount {
            user_id: require_user(action_type, user_id)?,
            status: AccountStatus::Banned,
        },
        ActionType::ContentShadowban => Effect::HideContent {
            content: require_content(action_type, content)?,
            reason: reason.to_string(),
        },
        ActionType::ContentDeleted | ActionType::ContentDeletedPermanent => Effect::DeleteContent {
            content: require_content(action_type, content)?,
        },
        ActionType::ContentRestored => Effect::RestoreContent {
            content: require_content(action_type, content)?,
        },
    };
    Ok(effect)
}

/// What undoing an approved appeal on `action` does. Deletions and warnings
/// have nothing to restore.
pub fn reversal(action: &ModerationActionModel) -> Effect {
    match (action.action_type, action.content_ref(), action.user_id) {
        (ActionType::ContentShadowban, Some(content), _) => Effect::RestoreContent { content },
        (t, _, Some(user_id)) if t.restricts_account() => Effect::ReactivateAccount {
            user_id,
            action_id: action.id,
        },
        _ => Effect::None,
    }
}

/// The status `user_id` is owed by its committed ledger entries, ignoring
/// `except_action`: banned while a ban holds, suspended while a suspension
/// has not expired, active otherwise.
pub async fn standing_status(
    db: &DatabaseConnection,
    user_id: i32,
    except_action: Option<i32>,
) -> AppResult<AccountStatus> {
    let now = chrono::Utc::now().naive_utc();
    let mut query = ModerationAction::find()
        .filter(moderation_action::Column::UserId.eq(user_id))
        .filter(moderation_action::Column::EffectState.eq(EffectState::Committed))
        .filter(
            Condition::any()
                .add(moderation_action::Column::ActionType.eq(ActionType::Ban))
                .add(
                    Condition::all()
                        .add(moderation_action::Column::ActionType.is_in(ActionType::SUSPENSIONS))
                        .add(moderation_action::Column::SuspensionUntil.gt(now)),
                ),
        );
    if let Some(id) = except_action {
        query = query.filter(moderation_action::Column::Id.ne(id));
    }

    let live = query.all(db).await?;
    Ok(if live.iter().any(|a| a.action_type == ActionType::Ban) {
        AccountStatus::Banned
    } else if live.is_empty() {
        AccountStatus::Active
    } else {
        AccountStatus::Suspended
    })
}

/// Lower a restricted account to what its remaining restrictions justify.
/// Never raises a restriction. Returns the new status when it changed.
pub async fn relax_account(
    db: &DatabaseConnection,
    account: UserModel,
    except_action: Option<i32>,
) -> AppResult<Option<AccountStatus>> {
    let standing = standing_status(db, account.id, except_action).await?;
    let lowers = matches!(
        (&account.account_status, &standing),
        (AccountStatus::Banned, AccountStatus::Suspended | AccountStatus::Active)
            | (AccountStatus::Suspended, AccountStatus::Active)
    );
    if !lowers {
        return Ok(None);
    }

    let mut active: user::ActiveModel = account.into();
    active.account_status = Set(standing.clone());
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(db).await?;
    Ok(Some(standing))
}

pub struct EffectApplier {
    db: DatabaseConnection,
}

impl EffectApplier {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn apply(&self, effect: &Effect) -> AppResult<()> {
        match effect {
            Effect::None => Ok(()),
            Effect::HideContent { content, reason } => self.hide(*content, reason).await,
            Effect::RestoreContent { content } => self.restore(*content).await,
            Effect::DeleteContent { content } => self.delete(*content).await,
            Effect::RestrictAccount { user_id, status } => {
                self.restrict(*user_id, status.clone()).await
            }
            Effect::ReactivateAccount { user_id, action_id } => {
                self.reactivate(*user_id, *action_id).await
            }
        }
    }

    async fn hide(&self, content: ContentRef, reason: &str) -> AppResult<()> {
        let now = chrono::Utc::now().naive_utc();
        match content.content_type {
            ContentType::Post => {
                let existing = Post::find_by_id(content.content_id)
                    .one(&self.db)
                    .await?
                    .ok_or(AppError::NotFound)?;
                if existing.shadowbanned && !existing.published {
                    return Ok(());
                }
                let mut active: post::ActiveModel = existing.into();
                active.shadowbanned = Set(true);
                active.published = Set(false);
                active.shadowbanned_reason = Set(Some(reason.to_string()));
                active.shadowbanned_at = Set(Some(now));
                active.update(&self.db).await?;
            }
            ContentType::Comment => {
                let existing = Comment::find_by_id(content.content_id)
                    .one(&self.db)
                    .await?
                    .ok_or(AppError::NotFound)?;
                if existing.hidden {
                    return Ok(());
                }
                let mut active: comment::ActiveModel = existing.into();
                active.hidden = Set(true);
                active.shadowbanned_reason = Set(Some(reason.to_string()));
                active.shadowbanned_at = Set(Some(now));
                active.update(&self.db).await?;
            }
        }
        tracing::info!("Hid {:?} {}", content.content_type, content.content_id);
        Ok(())
    }

    async fn restore(&self, content: ContentRef) -> AppResult<()> {
        match content.content_type {
            ContentType::Post => {
                let Some(existing) = Post::find_by_id(content.content_id).one(&self.db).await?
                else {
                    tracing::warn!(
                        "Post {} no longer exists, nothing to restore",
                        content.content_id
                    );
                    return Ok(());
                };
                if existing.published
                    && !existing.shadowbanned
                    && existing.shadowbanned_reason.is_none()
                    && existing.shadowbanned_at.is_none()
                {
                    return Ok(());
                }
                let mut active: post::ActiveModel = existing.into();
                active.shadowbanned = Set(false);
                active.published = Set(true);
                active.shadowbanned_reason = Set(None);
                active.shadowbanned_at = Set(None);
                active.update(&self.db).await?;
            }
            ContentType::Comment => {
                let Some(existing) = Comment::find_by_id(content.content_id)
                    .one(&self.db)
                    .await?
                else {
                    tracing::warn!(
                        "Comment {} no longer exists, nothing to restore",
                        content.content_id
                    );
                    return Ok(());
                };
                if !existing.hidden
                    && existing.shadowbanned_reason.is_none()
                    && existing.shadowbanned_at.is_none()
                {
                    return Ok(());
                }
                let mut active: comment::ActiveModel = existing.into();
                active.hidden = Set(false);
                active.shadowbanned_reason = Set(None);
                active.shadowbanned_at = Set(None);
                active.update(&self.db).await?;
            }
        }
        tracing::info!("Restored {:?} {}", content.content_type, content.content_id);
        Ok(())
    }

    async fn delete(&self, content: ContentRef) -> AppResult<()> {
        let result = match content.content_type {
            ContentType::Post => Post::delete_by_id(content.content_id).exec(&self.db).await?,
            ContentType::Comment => {
                Comment::delete_by_id(content.content_id)
                    .exec(&self.db)
                    .await?
            }
        };
        if result.rows_affected > 0 {
            tracing::info!("Deleted {:?} {}", content.content_type, content.content_id);
        }
        Ok(())
    }

    async fn restrict(&self, user_id: i32, status: AccountStatus) -> AppResult<()> {
        let existing = User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        if existing.account_status == status {
            return Ok(());
        }
        // A suspension never downgrades a ban.
        if existing.account_status == AccountStatus::Banned && status == AccountStatus::Suspended {
            tracing::info!("User {} is banned, keeping ban over suspension", user_id);
            return Ok(());
        }

        let mut active: user::ActiveModel = existing.into();
        active.account_status = Set(status.clone());
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        active.update(&self.db).await?;

        tracing::info!("User {} account status set to {:?}", user_id, status);
        Ok(())
    }

    async fn reactivate(&self, user_id: i32, action_id: i32) -> AppResult<()> {
        let Some(existing) = User::find_by_id(user_id).one(&self.db).await? else {
            tracing::warn!("User {} no longer exists, nothing to reactivate", user_id);
            return Ok(());
        };
        let before = existing.account_status.clone();

        match relax_account(&self.db, existing, Some(action_id)).await? {
            Some(status) => {
                tracing::info!(
                    "User {} set to {:?} (action {} reversed)",
                    user_id,
                    status,
                    action_id
                );
            }
            None if matches!(before, AccountStatus::Suspended | AccountStatus::Banned) => {
                tracing::warn!(
                    "User {} stays {:?}: another restriction still holds (action {} reversed)",
                    user_id,
                    before,
                    action_id
                );
            }
            None => {}
        }
        Ok(())
    }
}
