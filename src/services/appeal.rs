use crate::{
    config::moderation::ModerationConfig,
    context::CallerContext,
    error::{AppError, AppResult},
    models::{
        moderation_action, AppealDecision, AppealStatus, Capability, EffectState,
        ModerationActionModel,
    },
    services::{
        effects::{self, EffectApplier},
        ledger::LedgerService,
    },
};
use sea_orm::{ActiveValue::Set, DatabaseConnection};

/// Trim and bound-check appeal text. Runs before any lookup.
pub fn validate_appeal_text<'a>(text: &'a str, config: &ModerationConfig) -> AppResult<&'a str> {
    let text = text.trim();
    let chars = text.chars().count();
    if chars < config.appeal_min_chars {
        return Err(AppError::appeal_too_short(config.appeal_min_chars));
    }
    if chars > config.appeal_max_chars {
        return Err(AppError::Validation(format!(
            "appeal text must be at most {} characters",
            config.appeal_max_chars
        )));
    }
    Ok(text)
}

pub struct AppealService {
    db: DatabaseConnection,
    ledger: LedgerService,
}

impl AppealService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            ledger: LedgerService::new(db.clone()),
            db,
        }
    }

    /// Open an appeal. Submitting also acknowledges the notice.
    pub async fn submit(
        &self,
        caller: &CallerContext,
        action_id: i32,
        text: &str,
        config: &ModerationConfig,
    ) -> AppResult<ModerationActionModel> {
        let text = validate_appeal_text(text, config)?;

        let existing = self.ledger.get(action_id).await?;
        existing.ensure_appealable_by(caller.user_id)?;

        let now = chrono::Utc::now().naive_utc();
        let updated = self
            .ledger
            .write_versioned(
                &existing,
                moderation_action::ActiveModel {
                    appeal_status: Set(AppealStatus::Pending),
                    appeal_text: Set(Some(text.to_string())),
                    appeal_submitted_at: Set(Some(now)),
                    user_notified: Set(true),
                    user_notified_at: Set(existing.user_notified_at.or(Some(now))),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            "User {} appealed action {} ({} chars)",
            caller.user_id,
            action_id,
            text.chars().count()
        );
        Ok(updated)
    }

    /// Decide a pending appeal. Approval reverses the action; if the reversal
    /// fails the entry stays `reversal_pending` and the decision still stands.
    pub async fn resolve(
        &self,
        caller: &CallerContext,
        action_id: i32,
        decision: AppealDecision,
        expected_version: Option<i32>,
    ) -> AppResult<ModerationActionModel> {
        caller.require(Capability::Moderate)?;

        let existing = self.ledger.get(action_id).await?;
        if decision == AppealDecision::Approved {
            if let Some(extra) = existing.action_type.extra_capability() {
                caller.require(extra)?;
            }
        }
        if let Some(v) = expected_version {
            if v != existing.version {
                return Err(AppError::version_conflict("moderation action", action_id));
            }
        }
        existing.appeal_status.ensure_can_resolve()?;

        let mut changes = moderation_action::ActiveModel {
            appeal_status: Set(decision.status()),
            appeal_response: Set(Some(decision.canned_response().to_string())),
            appeal_resolved_at: Set(Some(chrono::Utc::now().naive_utc())),
            appeal_resolved_by: Set(Some(caller.user_id)),
            user_notified: Set(false),
            user_notified_at: Set(None),
            ..Default::default()
        };
        let approved = decision == AppealDecision::Approved;
        if approved {
            changes.effect_state = Set(EffectState::ReversalPending);
        }

        let decided = self.ledger.write_versioned(&existing, changes).await?;
        tracing::info!(
            "Appeal on action {} {:?} by {}",
            action_id,
            decision,
            caller.user_id
        );

        if !approved {
            return Ok(decided);
        }

        match EffectApplier::new(self.db.clone())
            .apply(&effects::reversal(&decided))
            .await
        {
            Ok(()) => {
                self.ledger
                    .transition(
                        action_id,
                        EffectState::ReversalPending,
                        EffectState::Reversed,
                    )
                    .await?;
                tracing::info!("Action {} reversed", action_id);
                self.ledger.get(action_id).await
            }
            Err(err) => {
                tracing::error!(
                    "Reversal of action {} failed, will retry: {}",
                    action_id,
                    err
                );
                Ok(decided)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appeal_text_is_trimmed_and_counted_in_characters() {
        let cfg = ModerationConfig::default();
        let padded = format!("   {}   ", "ü".repeat(20));
        assert_eq!(
            validate_appeal_text(&padded, &cfg).unwrap().chars().count(),
            20
        );
    }

    #[test]
    fn short_appeal_is_rejected_with_tag() {
        let cfg = ModerationConfig::default();
        let err = validate_appeal_text("not spam!!", &cfg).unwrap_err();
        assert!(err.to_string().contains("AppealTooShort"));
        assert!(validate_appeal_text(&" ".repeat(40), &cfg).is_err());
    }

    #[test]
    fn long_appeal_is_rejected() {
        let cfg = ModerationConfig::default();
        let text = "a".repeat(cfg.appeal_max_chars + 1);
        assert!(matches!(
            validate_appeal_text(&text, &cfg),
            Err(AppError::Validation(_))
        ));
    }
}
