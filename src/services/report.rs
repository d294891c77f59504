use crate::{
    context::CallerContext,
    error::{AppError, AppResult},
    models::{
        report, ActionType, Capability, ContentRef, ModerationActionModel, Report,
        ReportCategory, ReportModel, ReportPriority, ReportStatus,
    },
    services::{
        content::ContentService,
        ledger::{LedgerService, RecordAction},
    },
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};

pub const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<ReportCategory>,
    pub priority: Option<ReportPriority>,
}

pub struct ReportService {
    db: DatabaseConnection,
}

impl ReportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_report(
        &self,
        caller: &CallerContext,
        content: ContentRef,
        category: ReportCategory,
        description: Option<&str>,
    ) -> AppResult<ReportModel> {
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS) {
            return Err(AppError::Validation(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }

        let owner = ContentService::new(self.db.clone())
            .owner_of(content)
            .await?;

        let duplicate = Report::find()
            .filter(report::Column::ReporterId.eq(caller.user_id))
            .filter(report::Column::ReportedContentType.eq(content.content_type))
            .filter(report::Column::ReportedContentId.eq(content.content_id))
            .filter(report::Column::Status.is_in([ReportStatus::Pending, ReportStatus::Reviewing]))
            .one(&self.db)
            .await?;
        if duplicate.is_some() {
            return Err(AppError::Conflict(
                "you already have an open report on this content".to_string(),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        let saved = report::ActiveModel {
            reporter_id: Set(caller.user_id),
            reported_content_type: Set(content.content_type),
            reported_content_id: Set(content.content_id),
            reported_user_id: Set(owner),
            category: Set(category),
            priority: Set(category.default_priority()),
            description: Set(description.map(str::to_string)),
            status: Set(ReportStatus::Pending),
            version: Set(1),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::info!(
            "User {} reported {:?} {} ({:?}, report {})",
            caller.user_id,
            content.content_type,
            content.content_id,
            category,
            saved.id
        );
        Ok(saved)
    }

    pub async fn list_reports(
        &self,
        caller: &CallerContext,
        filter: ReportFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ReportModel>, u64)> {
        caller.require(Capability::ViewReports)?;

        let mut query = Report::find();
        if let Some(s) = filter.status {
            query = query.filter(report::Column::Status.eq(s));
        }
        if let Some(c) = filter.category {
            query = query.filter(report::Column::Category.eq(c));
        }
        if let Some(p) = filter.priority {
            query = query.filter(report::Column::Priority.eq(p));
        }

        let paginator = query
            .order_by_desc(report::Column::CreatedAt)
            .order_by_desc(report::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let reports = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((reports, total))
    }

    pub async fn get_report(&self, caller: &CallerContext, id: i32) -> AppResult<ReportModel> {
        caller.require(Capability::ViewReports)?;
        self.find(id).await
    }

    async fn find(&self, id: i32) -> AppResult<ReportModel> {
        Report::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn load_checked(&self, id: i32, expected_version: Option<i32>) -> AppResult<ReportModel> {
        let existing = self.find(id).await?;
        if let Some(v) = expected_version {
            if v != existing.version {
                return Err(AppError::version_conflict("report", id));
            }
        }
        Ok(existing)
    }

    /// Conditional write on `current.version`; bumps the version.
    async fn write_versioned(
        &self,
        current: &ReportModel,
        mut changes: report::ActiveModel,
    ) -> AppResult<ReportModel> {
        changes.version = Set(current.version + 1);
        let result = Report::update_many()
            .set(changes)
            .filter(report::Column::Id.eq(current.id))
            .filter(report::Column::Version.eq(current.version))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::version_conflict("report", current.id));
        }
        self.find(current.id).await
    }

    pub async fn take_in_review(
        &self,
        caller: &CallerContext,
        id: i32,
        expected_version: Option<i32>,
    ) -> AppResult<ReportModel> {
        caller.require(Capability::Moderate)?;

        let existing = self.load_checked(id, expected_version).await?;
        existing.status.ensure_can_take_in_review()?;

        let updated = self
            .write_versioned(
                &existing,
                report::ActiveModel {
                    status: Set(ReportStatus::Reviewing),
                    reviewed_by: Set(Some(caller.user_id)),
                    reviewed_at: Set(Some(chrono::Utc::now().naive_utc())),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!("Report {} taken in review by {}", id, caller.user_id);
        Ok(updated)
    }

    /// Record `action_type` against the reported content/user, then close the
    /// report. The report stays open if the action cannot be recorded.
    pub async fn resolve_with_action(
        &self,
        caller: &CallerContext,
        id: i32,
        action_type: ActionType,
        reason: &str,
        expected_version: Option<i32>,
    ) -> AppResult<(ReportModel, ModerationActionModel)> {
        LedgerService::authorize(caller, action_type)?;

        if !action_type.allowed_from_report() {
            return Err(AppError::Validation(format!(
                "{} cannot be issued from a report",
                action_type.title()
            )));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("reason is required".to_string()));
        }

        let existing = self.load_checked(id, expected_version).await?;
        existing.status.ensure_can_close()?;

        let content = ContentRef::new(existing.reported_content_type, existing.reported_content_id);
        let action = LedgerService::new(self.db.clone())
            .record_action(
                caller,
                RecordAction {
                    user_id: existing.reported_user_id,
                    action_type,
                    reason: reason.to_string(),
                    report_id: Some(existing.id),
                    content: action_type.targets_content().then_some(content),
                },
            )
            .await?;

        let updated = self
            .write_versioned(
                &existing,
                report::ActiveModel {
                    status: Set(ReportStatus::Resolved),
                    resolved_by: Set(Some(caller.user_id)),
                    resolved_at: Set(Some(chrono::Utc::now().naive_utc())),
                    moderator_notes: Set(Some(format!("{}: {}", action_type.title(), reason))),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            "Report {} resolved by {} with action {}",
            id,
            caller.user_id,
            action.id
        );
        Ok((updated, action))
    }

    pub async fn dismiss(
        &self,
        caller: &CallerContext,
        id: i32,
        reason: &str,
        expected_version: Option<i32>,
    ) -> AppResult<ReportModel> {
        caller.require(Capability::Moderate)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("reason is required".to_string()));
        }

        let existing = self.load_checked(id, expected_version).await?;
        existing.status.ensure_can_close()?;

        let updated = self
            .write_versioned(
                &existing,
                report::ActiveModel {
                    status: Set(ReportStatus::Dismissed),
                    resolved_by: Set(Some(caller.user_id)),
                    resolved_at: Set(Some(chrono::Utc::now().naive_utc())),
                    moderator_notes: Set(Some(reason.to_string())),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!("Report {} dismissed by {}", id, caller.user_id);
        Ok(updated)
    }

    /// Close open reports whose action was committed but whose own write never
    /// landed.
    pub async fn settle_orphaned(&self) -> AppResult<usize> {
        use crate::models::{moderation_action, EffectState, ModerationAction};

        let actions = ModerationAction::find()
            .filter(moderation_action::Column::ReportId.is_not_null())
            .filter(moderation_action::Column::EffectState.is_in(EffectState::DELIVERABLE))
            .find_also_related(Report)
            .filter(report::Column::Status.is_in([ReportStatus::Pending, ReportStatus::Reviewing]))
            .all(&self.db)
            .await?;

        let mut settled = 0;
        for (action, report) in actions {
            let Some(report) = report else { continue };
            let result = self
                .write_versioned(
                    &report,
                    report::ActiveModel {
                        status: Set(ReportStatus::Resolved),
                        resolved_by: Set(Some(action.moderator_id)),
                        resolved_at: Set(Some(chrono::Utc::now().naive_utc())),
                        moderator_notes: Set(Some(format!(
                            "{}: {}",
                            action.action_type.title(),
                            action.reason
                        ))),
                        ..Default::default()
                    },
                )
                .await;
            match result {
                Ok(_) => {
                    tracing::info!("Report {} settled from action {}", report.id, action.id);
                    settled += 1;
                }
                Err(AppError::Conflict(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(settled)
    }
}
