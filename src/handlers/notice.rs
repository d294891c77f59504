use crate::config::moderation::ModerationConfig;
use crate::context::CallerContext;
use crate::delivery::{tracker::DeliveryTracker, Notice};
use crate::error::{AppError, AppResult};
use crate::handlers::report::invalidate_stats;
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::appeal::AppealService;
use crate::services::cache::CacheService;
use crate::services::ledger::LedgerService;
use crate::services::notice::{NextNotice, NoticeService};
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct NextNoticeResponse {
    /// Notice to present now, if any
    pub notice: Option<Notice>,
    /// Set while the pause after the previous answer is running
    pub retry_after_ms: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AppealRequest {
    pub text: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/notices",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Undelivered notices, newest first", body = Vec<Notice>),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "notices"
)]
pub async fn list_notices(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
) -> AppResult<impl IntoResponse> {
    let pending = NoticeService::new(db).fetch_pending(caller.user_id).await?;
    let notices: Vec<Notice> = pending.into_iter().map(Notice::from).collect();
    Ok(ApiResponse::ok(notices))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/notices/next",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Notice to present, or how long to wait", body = NextNoticeResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "notices"
)]
pub async fn next_notice(
    Extension(db): Extension<DatabaseConnection>,
    Extension(tracker): Extension<DeliveryTracker>,
    caller: CallerContext,
) -> AppResult<impl IntoResponse> {
    let next = NoticeService::new(db).next(&caller, &tracker).await?;

    let body = match next {
        NextNotice::Show(action) => NextNoticeResponse {
            notice: Some(Notice::from(action)),
            retry_after_ms: None,
        },
        NextNotice::Wait(wait) => NextNoticeResponse {
            notice: None,
            retry_after_ms: Some(wait.as_millis().max(1) as u64),
        },
        NextNotice::Empty => NextNoticeResponse {
            notice: None,
            retry_after_ms: None,
        },
    };
    Ok(ApiResponse::ok(body))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/notices/{id}/acknowledge",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Action ID")),
    responses(
        (status = 200, description = "Notice marked delivered", body = Notice),
        (status = 403, description = "Not your notice", body = AppError),
        (status = 404, description = "Action not found", body = AppError),
    ),
    tag = "notices"
)]
pub async fn acknowledge_notice(
    Extension(db): Extension<DatabaseConnection>,
    Extension(tracker): Extension<DeliveryTracker>,
    caller: CallerContext,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let action = NoticeService::new(db).acknowledge(&caller, id).await?;
    tracker.answered(caller.user_id, id);
    Ok(ApiResponse::ok(Notice::from(action)))
}

#[utoipa::path(
    post,
    path = "/api/v1/moderation/actions/{id}/appeal",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Action ID")),
    request_body = AppealRequest,
    responses(
        (status = 200, description = "Appeal submitted", body = Notice),
        (status = 400, description = "AppealTooShort or too long", body = AppError),
        (status = 403, description = "Not your action", body = AppError),
        (status = 409, description = "Already appealed or not appealable", body = AppError),
    ),
    tag = "notices"
)]
pub async fn submit_appeal(
    Extension(db): Extension<DatabaseConnection>,
    Extension(tracker): Extension<DeliveryTracker>,
    Extension(config): Extension<ModerationConfig>,
    cache: Option<Extension<CacheService>>,
    caller: CallerContext,
    Path(id): Path<i32>,
    Json(payload): Json<AppealRequest>,
) -> AppResult<impl IntoResponse> {
    let action = AppealService::new(db)
        .submit(&caller, id, &payload.text, &config)
        .await?;
    tracker.answered(caller.user_id, id);

    invalidate_stats(cache).await;
    Ok(ApiResponse::with_message(
        Notice::from(action),
        "Your appeal has been submitted",
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/moderation/actions/mine",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Your moderation history", body = PaginatedResponse<Notice>),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "notices"
)]
pub async fn my_actions(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.resolve();
    let (actions, total) = LedgerService::new(db)
        .list_mine(&caller, page, per_page)
        .await?;
    let items = actions.into_iter().map(Notice::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}
