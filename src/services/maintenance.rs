use crate::{
    config::moderation::ModerationConfig,
    error::AppResult,
    models::{user, AccountStatus, User},
    services::{effects::relax_account, ledger::LedgerService, report::ReportService},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub reconciled: usize,
    pub reversals: usize,
    pub reports_settled: usize,
    pub suspensions_lifted: usize,
}

pub struct MaintenanceService {
    db: DatabaseConnection,
    pending_grace: Duration,
}

impl MaintenanceService {
    pub fn new(db: DatabaseConnection, pending_grace: Duration) -> Self {
        Self { db, pending_grace }
    }

    /// One sweep. Each step is independent; a failing step is logged and the
    /// rest still run.
    pub async fn run_once(&self) -> MaintenanceReport {
        let ledger = LedgerService::new(self.db.clone());

        MaintenanceReport {
            reconciled: settle(
                "reconcile pending actions",
                ledger.reconcile_pending(self.pending_grace).await,
            ),
            reversals: settle("retry reversals", ledger.retry_reversals().await),
            reports_settled: settle(
                "settle reports",
                ReportService::new(self.db.clone()).settle_orphaned().await,
            ),
            suspensions_lifted: settle(
                "lift expired suspensions",
                self.lift_expired_suspensions().await,
            ),
        }
    }

    /// Bring restricted accounts down to what their live restrictions
    /// justify: an expired suspension lifts, a ban whose entry was reversed
    /// falls back to any suspension still running.
    pub async fn lift_expired_suspensions(&self) -> AppResult<usize> {
        let restricted = User::find()
            .filter(
                user::Column::AccountStatus
                    .is_in([AccountStatus::Suspended, AccountStatus::Banned]),
            )
            .all(&self.db)
            .await?;

        let mut lifted = 0;
        for account in restricted {
            let id = account.id;
            let before = account.account_status.clone();
            if let Some(status) = relax_account(&self.db, account, None).await? {
                tracing::info!("User {} restriction expired: {:?} -> {:?}", id, before, status);
                lifted += 1;
            }
        }
        Ok(lifted)
    }
}

fn settle(step: &str, result: AppResult<usize>) -> usize {
    match result {
        Ok(n) => n,
        Err(err) => {
            tracing::error!("Maintenance step '{}' failed: {}", step, err);
            0
        }
    }
}

pub fn spawn_maintenance(db: DatabaseConnection, config: &ModerationConfig) -> JoinHandle<()> {
    let service = MaintenanceService::new(db, config.pending_effect_grace);
    let period = config.reconcile_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = service.run_once().await;
            if report != MaintenanceReport::default() {
                tracing::info!("Maintenance sweep: {:?}", report);
            }
        }
    })
}
