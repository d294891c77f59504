use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ModerationActions {
    Table,
    Id,
    UserId,
    ModeratorId,
    ActionType,
    Reason,
    ReportId,
    ContentType,
    ContentId,
    SuspensionUntil,
    UserNotified,
    UserNotifiedAt,
    AppealStatus,
    AppealText,
    AppealSubmittedAt,
    AppealResponse,
    AppealResolvedAt,
    AppealResolvedBy,
    EffectState,
    Version,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ModerationActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModerationActions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModerationActions::UserId).integer().null())
                    .col(
                        ColumnDef::new(ModerationActions::ModeratorId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::ActionType)
                            .string_len(40)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationActions::Reason).text().not_null())
                    .col(ColumnDef::new(ModerationActions::ReportId).integer().null())
                    .col(
                        ColumnDef::new(ModerationActions::ContentType)
                            .string_len(20)
                            .null(),
                    )
                    .col(ColumnDef::new(ModerationActions::ContentId).integer().null())
                    .col(
                        ColumnDef::new(ModerationActions::SuspensionUntil)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::UserNotified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::UserNotifiedAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::AppealStatus)
                            .string_len(20)
                            .not_null()
                            .default("none"),
                    )
                    .col(ColumnDef::new(ModerationActions::AppealText).text().null())
                    .col(
                        ColumnDef::new(ModerationActions::AppealSubmittedAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::AppealResponse)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::AppealResolvedAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::AppealResolvedBy)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::EffectState)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ModerationActions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_moderation_actions_user_id")
                            .from(ModerationActions::Table, ModerationActions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_moderation_actions_moderator_id")
                            .from(ModerationActions::Table, ModerationActions::ModeratorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_moderation_actions_report_id")
                            .from(ModerationActions::Table, ModerationActions::ReportId)
                            .to(Reports::Table, Reports::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModerationActions::Table).to_owned())
            .await
    }
}
