use crate::context::CallerContext;
use crate::error::{AppError, AppResult};
use crate::handlers::report::invalidate_stats;
use crate::models::{
    parse_enum, ActionType, AppealDecision, AppealStatus, ContentRef, ContentType, EffectState,
    ModerationActionModel,
};
use crate::response::{resolve_page, ApiResponse, PaginatedResponse};
use crate::services::appeal::AppealService;
use crate::services::cache::CacheService;
use crate::services::content::{ContentFilter, ContentItem, ContentService};
use crate::services::ledger::{LedgerFilter, LedgerService, RecordAction};
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Full ledger entry as seen from the console.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub id: i32,
    pub user_id: Option<i32>,
    pub moderator_id: i32,
    pub action_type: ActionType,
    pub title: String,
    pub reason: String,
    pub report_id: Option<i32>,
    pub content: Option<ContentRef>,
    pub suspension_until: Option<String>,
    pub user_notified: bool,
    pub user_notified_at: Option<String>,
    pub appeal_status: AppealStatus,
    pub appeal_text: Option<String>,
    pub appeal_submitted_at: Option<String>,
    pub appeal_response: Option<String>,
    pub appeal_resolved_at: Option<String>,
    pub appeal_resolved_by: Option<i32>,
    pub effect_state: EffectState,
    pub version: i32,
    pub created_at: String,
}

impl From<ModerationActionModel> for ActionResponse {
    fn from(a: ModerationActionModel) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            moderator_id: a.moderator_id,
            action_type: a.action_type,
            title: a.action_type.title().to_string(),
            content: a.content_ref(),
            report_id: a.report_id,
            suspension_until: a.suspension_until.map(|t| t.to_string()),
            user_notified: a.user_notified,
            user_notified_at: a.user_notified_at.map(|t| t.to_string()),
            appeal_status: a.appeal_status,
            appeal_submitted_at: a.appeal_submitted_at.map(|t| t.to_string()),
            appeal_resolved_at: a.appeal_resolved_at.map(|t| t.to_string()),
            appeal_resolved_by: a.appeal_resolved_by,
            effect_state: a.effect_state,
            version: a.version,
            created_at: a.created_at.to_string(),
            reason: a.reason,
            appeal_text: a.appeal_text,
            appeal_response: a.appeal_response,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordActionRequest {
    pub user_id: Option<i32>,
    #[validate(length(min = 1, max = 40))]
    pub action_type: String,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    pub content_type: Option<String>,
    pub content_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListActionsQuery {
    pub user_id: Option<i32>,
    pub action_type: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListAppealsQuery {
    /// none, pending, approved or rejected
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveAppealRequest {
    pub decision: AppealDecision,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListContentQuery {
    /// post (default) or comment
    pub content_type: Option<String>,
    pub shadowbanned: Option<bool>,
    pub visible: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

fn content_from_request(
    content_type: Option<&str>,
    content_id: Option<i32>,
) -> AppResult<Option<ContentRef>> {
    match (content_type, content_id) {
        (Some(t), Some(id)) => Ok(Some(ContentRef::new(parse_enum(t, "content_type")?, id))),
        (None, None) => Ok(None),
        _ => Err(AppError::Validation(
            "content_type and content_id must be given together".to_string(),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/moderation/actions",
    security(("jwt_token" = [])),
    request_body = RecordActionRequest,
    responses(
        (status = 200, description = "Action recorded and applied", body = ActionResponse),
        (status = 400, description = "Validation error or InvalidActionType", body = AppError),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 404, description = "Target user or content not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn record_action(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    caller: CallerContext,
    Json(payload): Json<RecordActionRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let action_type = ActionType::parse(&payload.action_type)?;
    let content = content_from_request(payload.content_type.as_deref(), payload.content_id)?;

    let action = LedgerService::new(db)
        .record_action(
            &caller,
            RecordAction {
                user_id: payload.user_id,
                action_type,
                reason: payload.reason,
                report_id: None,
                content,
            },
        )
        .await?;

    invalidate_stats(cache).await;
    Ok(ApiResponse::ok(ActionResponse::from(action)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/moderation/actions",
    security(("jwt_token" = [])),
    params(
        ("user_id" = Option<i32>, Query, description = "Filter by subject"),
        ("action_type" = Option<String>, Query, description = "Filter by action type"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = PaginatedResponse<ActionResponse>),
        (status = 403, description = "Missing capability", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn list_actions(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Query(params): Query<ListActionsQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = LedgerFilter {
        user_id: params.user_id,
        action_type: params
            .action_type
            .as_deref()
            .map(ActionType::parse)
            .transpose()?,
    };
    let (page, per_page) = resolve_page(params.page, params.per_page);

    let (actions, total) = LedgerService::new(db)
        .list(&caller, filter, page, per_page)
        .await?;
    let items = actions.into_iter().map(ActionResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/moderation/actions/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Action ID")),
    responses(
        (status = 200, description = "Ledger entry", body = ActionResponse),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 404, description = "Action not found", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn get_action(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let action = LedgerService::new(db).get_for_console(&caller, id).await?;
    Ok(ApiResponse::ok(ActionResponse::from(action)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/moderation/appeals",
    security(("jwt_token" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by appeal status"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Appealed entries, most recent first", body = PaginatedResponse<ActionResponse>),
        (status = 403, description = "Missing capability", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn list_appeals(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Query(params): Query<ListAppealsQuery>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(|s| parse_enum(s, "appeal status"))
        .transpose()?;
    let (page, per_page) = resolve_page(params.page, params.per_page);

    let (actions, total) = LedgerService::new(db)
        .list_appeals(&caller, status, page, per_page)
        .await?;
    let items = actions.into_iter().map(ActionResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/moderation/appeals/{id}/resolve",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Action ID")),
    request_body = ResolveAppealRequest,
    responses(
        (status = 200, description = "Appeal decided", body = ActionResponse),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 404, description = "Action not found", body = AppError),
        (status = 409, description = "Appeal not pending, or modified concurrently", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn resolve_appeal(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    caller: CallerContext,
    Path(id): Path<i32>,
    Json(payload): Json<ResolveAppealRequest>,
) -> AppResult<impl IntoResponse> {
    let action = AppealService::new(db)
        .resolve(&caller, id, payload.decision, payload.expected_version)
        .await?;

    invalidate_stats(cache).await;
    Ok(ApiResponse::with_message(
        ActionResponse::from(action),
        payload.decision.canned_response(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/moderation/content",
    security(("jwt_token" = [])),
    params(
        ("content_type" = Option<String>, Query, description = "post (default) or comment"),
        ("shadowbanned" = Option<bool>, Query, description = "Filter by shadowban flag"),
        ("visible" = Option<bool>, Query, description = "Filter by public visibility"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Content items", body = PaginatedResponse<ContentItem>),
        (status = 403, description = "Missing capability", body = AppError),
    ),
    tag = "moderation"
)]
pub async fn list_content(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Query(params): Query<ListContentQuery>,
) -> AppResult<impl IntoResponse> {
    caller.require(crate::models::Capability::ViewReports)?;

    let filter = ContentFilter {
        content_type: params
            .content_type
            .as_deref()
            .map(|s| parse_enum::<ContentType>(s, "content_type"))
            .transpose()?,
        shadowbanned: params.shadowbanned,
        visible: params.visible,
    };
    let (page, per_page) = resolve_page(params.page, params.per_page);

    let (items, total) = ContentService::new(db)
        .list(filter, page, per_page)
        .await?;

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}
