use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEXES: [(&str, &str); 4] = [
    (
        "idx_moderation_actions_user_notified",
        "moderation_actions (user_id, user_notified, created_at DESC)",
    ),
    (
        "idx_moderation_actions_appeal_status",
        "moderation_actions (appeal_status, appeal_submitted_at DESC)",
    ),
    (
        "idx_moderation_actions_effect_state",
        "moderation_actions (effect_state, created_at)",
    ),
    (
        "idx_reports_priority_status",
        "reports (priority, status, created_at DESC)",
    ),
];

/// At most one live ledger entry per report.
const REPORT_ACTION_INDEX: &str = "uq_moderation_actions_report_live";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for (name, target) in INDEXES {
            db.execute_unprepared(&format!("CREATE INDEX IF NOT EXISTS {} ON {}", name, target))
                .await?;
        }

        db.execute_unprepared(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON moderation_actions (report_id) \
             WHERE report_id IS NOT NULL AND effect_state <> 'aborted'",
            REPORT_ACTION_INDEX
        ))
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(&format!("DROP INDEX IF EXISTS {}", REPORT_ACTION_INDEX))
            .await?;

        for (name, _) in INDEXES {
            db.execute_unprepared(&format!("DROP INDEX IF EXISTS {}", name))
                .await?;
        }

        Ok(())
    }
}
