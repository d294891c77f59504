use super::content::ContentType;
use crate::error::{AppError, AppResult};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "reviewing")]
    Reviewing,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

impl ReportStatus {
    /// A moderator can still act on the report.
    pub fn is_open(self) -> bool {
        matches!(self, ReportStatus::Pending | ReportStatus::Reviewing)
    }

    pub fn ensure_can_take_in_review(self) -> AppResult<()> {
        match self {
            ReportStatus::Pending => Ok(()),
            other => Err(AppError::InvalidState(format!(
                "report is {:?}, only pending reports can be taken in review",
                other
            ))),
        }
    }

    pub fn ensure_can_close(self) -> AppResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "report is already {:?}",
                self
            )))
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum ReportPriority {
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "low")]
    Low,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(30))")]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    #[sea_orm(string_value = "cyberbullying")]
    Cyberbullying,
    #[sea_orm(string_value = "inappropriate")]
    Inappropriate,
    #[sea_orm(string_value = "spam")]
    Spam,
    #[sea_orm(string_value = "privacy")]
    Privacy,
    #[sea_orm(string_value = "misinformation")]
    Misinformation,
    #[sea_orm(string_value = "harassment")]
    Harassment,
    #[sea_orm(string_value = "other")]
    Other,
}

impl ReportCategory {
    pub fn default_priority(self) -> ReportPriority {
        match self {
            ReportCategory::Cyberbullying
            | ReportCategory::Privacy
            | ReportCategory::Harassment => ReportPriority::High,
            ReportCategory::Spam => ReportPriority::Low,
            ReportCategory::Inappropriate
            | ReportCategory::Misinformation
            | ReportCategory::Other => ReportPriority::Normal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub reporter_id: i32,
    pub reported_content_type: ContentType,
    pub reported_content_id: i32,
    pub reported_user_id: Option<i32>,
    pub category: ReportCategory,
    pub priority: ReportPriority,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime>,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<DateTime>,
    #[sea_orm(column_type = "Text", nullable)]
    pub moderator_notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReporterId",
        to = "super::user::Column::Id"
    )]
    Reporter,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReviewedBy",
        to = "super::user::Column::Id"
    )]
    Reviewer,
}

impl ActiveModelBehavior for ActiveModel {}
