use crate::{
    context::CallerContext,
    error::AppResult,
    models::{
        moderation_action, report, ActionType, AppealStatus, Capability, EffectState,
        ModerationAction, Report, ReportPriority, ReportStatus,
    },
    services::cache::CacheService,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const STATS_CACHE_KEY: &str = "modcenter:dashboard_stats";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub pending_reports: u64,
    pub high_priority_pending: u64,
    pub resolved_today: u64,
    pub active_suspensions: u64,
    pub pending_appeals: u64,
}

pub struct StatsService {
    db: DatabaseConnection,
}

impl StatsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_stats(
        &self,
        caller: &CallerContext,
        cache: Option<&CacheService>,
        ttl_secs: u64,
    ) -> AppResult<DashboardStats> {
        caller.require(Capability::ViewReports)?;

        if let Some(cache) = cache {
            if let Some(stats) = cache.get::<DashboardStats>(STATS_CACHE_KEY).await {
                return Ok(stats);
            }
        }

        let stats = self.compute().await?;

        if let Some(cache) = cache {
            cache.set(STATS_CACHE_KEY, &stats, ttl_secs).await;
        }
        Ok(stats)
    }

    pub async fn compute(&self) -> AppResult<DashboardStats> {
        let now = chrono::Utc::now().naive_utc();
        let midnight = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);

        let pending_reports = Report::find()
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .count(&self.db)
            .await?;

        let high_priority_pending = Report::find()
            .filter(report::Column::Status.eq(ReportStatus::Pending))
            .filter(report::Column::Priority.eq(ReportPriority::High))
            .count(&self.db)
            .await?;

        let resolved_today = Report::find()
            .filter(report::Column::Status.eq(ReportStatus::Resolved))
            .filter(report::Column::ResolvedAt.gte(midnight))
            .count(&self.db)
            .await?;

        let active_suspensions = ModerationAction::find()
            .filter(moderation_action::Column::ActionType.is_in(ActionType::SUSPENSIONS))
            .filter(moderation_action::Column::EffectState.eq(EffectState::Committed))
            .filter(moderation_action::Column::SuspensionUntil.gt(now))
            .count(&self.db)
            .await?;

        let pending_appeals = ModerationAction::find()
            .filter(moderation_action::Column::AppealStatus.eq(AppealStatus::Pending))
            .count(&self.db)
            .await?;

        Ok(DashboardStats {
            pending_reports,
            high_priority_pending,
            resolved_today,
            active_suspensions,
            pending_appeals,
        })
    }
}
