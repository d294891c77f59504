use crate::context::CallerContext;
use crate::error::{AppError, AppResult};
use crate::handlers::moderation::ActionResponse;
use crate::models::{
    parse_enum, ActionType, ContentRef, ContentType, ReportCategory, ReportModel, ReportPriority,
    ReportStatus,
};
use crate::response::{resolve_page, ApiResponse, PaginatedResponse};
use crate::services::cache::CacheService;
use crate::services::report::{ReportFilter, ReportService};
use crate::services::stats::STATS_CACHE_KEY;
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReportRequest {
    /// post or comment
    #[validate(length(min = 1, max = 20))]
    pub content_type: String,
    pub content_id: i32,
    /// cyberbullying, inappropriate, spam, privacy, misinformation, harassment or other
    #[validate(length(min = 1, max = 30))]
    pub category: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListReportsQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewReportRequest {
    /// Reject the write if the report changed since this version was read
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResolveReportRequest {
    #[validate(length(min = 1, max = 40))]
    pub action_type: String,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DismissReportRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub id: i32,
    pub reporter_id: i32,
    pub content_type: ContentType,
    pub content_id: i32,
    pub reported_user_id: Option<i32>,
    pub category: ReportCategory,
    pub priority: ReportPriority,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<String>,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<String>,
    pub moderator_notes: Option<String>,
    pub version: i32,
    pub created_at: String,
}

impl From<ReportModel> for ReportResponse {
    fn from(r: ReportModel) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            content_type: r.reported_content_type,
            content_id: r.reported_content_id,
            reported_user_id: r.reported_user_id,
            category: r.category,
            priority: r.priority,
            description: r.description,
            status: r.status,
            reviewed_by: r.reviewed_by,
            reviewed_at: r.reviewed_at.map(|t| t.to_string()),
            resolved_by: r.resolved_by,
            resolved_at: r.resolved_at.map(|t| t.to_string()),
            moderator_notes: r.moderator_notes,
            version: r.version,
            created_at: r.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveReportResponse {
    pub report: ReportResponse,
    pub action: ActionResponse,
}

pub(crate) async fn invalidate_stats(cache: Option<Extension<CacheService>>) {
    if let Some(Extension(cache)) = cache {
        cache.invalidate(STATS_CACHE_KEY).await;
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    security(("jwt_token" = [])),
    request_body = CreateReportRequest,
    responses(
        (status = 200, description = "Report created", body = ReportResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 404, description = "Content not found", body = AppError),
        (status = 409, description = "Open report already exists", body = AppError),
    ),
    tag = "reports"
)]
pub async fn create_report(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    caller: CallerContext,
    Json(payload): Json<CreateReportRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let content_type: ContentType = parse_enum(&payload.content_type, "content_type")?;
    let category: ReportCategory = parse_enum(&payload.category, "category")?;

    let service = ReportService::new(db);
    let report = service
        .create_report(
            &caller,
            ContentRef::new(content_type, payload.content_id),
            category,
            payload.description.as_deref(),
        )
        .await?;

    invalidate_stats(cache).await;
    Ok(ApiResponse::ok(ReportResponse::from(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reports",
    security(("jwt_token" = [])),
    params(
        ("status" = Option<String>, Query, description = "pending, reviewing, resolved or dismissed"),
        ("category" = Option<String>, Query, description = "Report category"),
        ("priority" = Option<String>, Query, description = "high, normal or low"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Reports, newest first", body = PaginatedResponse<ReportResponse>),
        (status = 403, description = "Missing capability", body = AppError),
    ),
    tag = "reports"
)]
pub async fn list_reports(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Query(params): Query<ListReportsQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = ReportFilter {
        status: params
            .status
            .as_deref()
            .map(|s| parse_enum(s, "status"))
            .transpose()?,
        category: params
            .category
            .as_deref()
            .map(|s| parse_enum(s, "category"))
            .transpose()?,
        priority: params
            .priority
            .as_deref()
            .map(|s| parse_enum(s, "priority"))
            .transpose()?,
    };
    let (page, per_page) = resolve_page(params.page, params.per_page);

    let service = ReportService::new(db);
    let (reports, total) = service
        .list_reports(&caller, filter, page, per_page)
        .await?;
    let items = reports.into_iter().map(ReportResponse::from).collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 404, description = "Report not found", body = AppError),
    ),
    tag = "reports"
)]
pub async fn get_report(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let report = ReportService::new(db).get_report(&caller, id).await?;
    Ok(ApiResponse::ok(ReportResponse::from(report)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/reports/{id}/review",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = ReviewReportRequest,
    responses(
        (status = 200, description = "Report taken in review", body = ReportResponse),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 409, description = "Not pending, or modified concurrently", body = AppError),
    ),
    tag = "reports"
)]
pub async fn review_report(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Path(id): Path<i32>,
    Json(payload): Json<ReviewReportRequest>,
) -> AppResult<impl IntoResponse> {
    let report = ReportService::new(db)
        .take_in_review(&caller, id, payload.expected_version)
        .await?;
    Ok(ApiResponse::ok(ReportResponse::from(report)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/reports/{id}/resolve",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = ResolveReportRequest,
    responses(
        (status = 200, description = "Action recorded and report resolved", body = ResolveReportResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 409, description = "Already closed, or modified concurrently", body = AppError),
    ),
    tag = "reports"
)]
pub async fn resolve_report(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    caller: CallerContext,
    Path(id): Path<i32>,
    Json(payload): Json<ResolveReportRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let action_type = ActionType::parse(&payload.action_type)?;

    let service = ReportService::new(db);
    let (report, action) = service
        .resolve_with_action(
            &caller,
            id,
            action_type,
            &payload.reason,
            payload.expected_version,
        )
        .await?;

    invalidate_stats(cache).await;
    Ok(ApiResponse::ok(ResolveReportResponse {
        report: ReportResponse::from(report),
        action: ActionResponse::from(action),
    }))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/reports/{id}/dismiss",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    request_body = DismissReportRequest,
    responses(
        (status = 200, description = "Report dismissed", body = ReportResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 409, description = "Already closed, or modified concurrently", body = AppError),
    ),
    tag = "reports"
)]
pub async fn dismiss_report(
    Extension(db): Extension<DatabaseConnection>,
    cache: Option<Extension<CacheService>>,
    caller: CallerContext,
    Path(id): Path<i32>,
    Json(payload): Json<DismissReportRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let report = ReportService::new(db)
        .dismiss(&caller, id, &payload.reason, payload.expected_version)
        .await?;

    invalidate_stats(cache).await;
    Ok(ApiResponse::ok(ReportResponse::from(report)))
}
