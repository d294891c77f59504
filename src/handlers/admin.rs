use crate::config::moderation::ModerationConfig;
use crate::context::CallerContext;
use crate::error::{AppError, AppResult};
use crate::models::{AccountStatus, AdminUserModel, Permissions, StaffRole, UserModel};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::cache::CacheService;
use crate::services::staff::StaffService;
use crate::services::stats::{DashboardStats, StatsService};
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantStaffRequest {
    pub user_id: i32,
    pub role: StaffRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStaffRequest {
    pub role: StaffRole,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StaffResponse {
    pub user_id: i32,
    pub username: Option<String>,
    pub account_status: Option<AccountStatus>,
    pub role: StaffRole,
    pub permissions: Permissions,
    pub created_by: Option<i32>,
    pub created_at: String,
}

impl StaffResponse {
    fn new(staff: AdminUserModel, user: Option<UserModel>) -> Self {
        Self {
            user_id: staff.user_id,
            permissions: staff.permissions(),
            role: staff.role,
            created_by: staff.created_by,
            created_at: staff.created_at.to_string(),
            username: user.as_ref().map(|u| u.username.clone()),
            account_status: user.map(|u| u.account_status),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Moderation dashboard counters", body = DashboardStats),
        (status = 403, description = "Missing capability", body = AppError),
    ),
    tag = "admin"
)]
pub async fn get_stats(
    Extension(db): Extension<DatabaseConnection>,
    Extension(config): Extension<ModerationConfig>,
    cache: Option<Extension<CacheService>>,
    caller: CallerContext,
) -> AppResult<impl IntoResponse> {
    let cache = cache.map(|Extension(c)| c);
    let stats = StatsService::new(db)
        .get_stats(&caller, cache.as_ref(), config.stats_cache_ttl_secs)
        .await?;
    Ok(ApiResponse::ok(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/staff",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Staff members", body = PaginatedResponse<StaffResponse>),
        (status = 403, description = "Missing capability", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_staff(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.resolve();
    let (staff, total) = StaffService::new(db)
        .list(&caller, page, per_page)
        .await?;
    let items = staff
        .into_iter()
        .map(|(s, u)| StaffResponse::new(s, u))
        .collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/staff",
    security(("jwt_token" = [])),
    request_body = GrantStaffRequest,
    responses(
        (status = 200, description = "Staff membership granted", body = StaffResponse),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 404, description = "User not found", body = AppError),
        (status = 409, description = "Already staff", body = AppError),
    ),
    tag = "admin"
)]
pub async fn grant_staff(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Json(payload): Json<GrantStaffRequest>,
) -> AppResult<impl IntoResponse> {
    let staff = StaffService::new(db)
        .grant(&caller, payload.user_id, payload.role)
        .await?;
    Ok(ApiResponse::ok(StaffResponse::new(staff, None)))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/staff/{user_id}",
    security(("jwt_token" = [])),
    params(("user_id" = i32, Path, description = "Staff member's user ID")),
    request_body = UpdateStaffRequest,
    responses(
        (status = 200, description = "Role updated", body = StaffResponse),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 404, description = "Not a staff member", body = AppError),
    ),
    tag = "admin"
)]
pub async fn update_staff(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Path(user_id): Path<i32>,
    Json(payload): Json<UpdateStaffRequest>,
) -> AppResult<impl IntoResponse> {
    let staff = StaffService::new(db)
        .update_role(&caller, user_id, payload.role)
        .await?;
    Ok(ApiResponse::ok(StaffResponse::new(staff, None)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/staff/{user_id}",
    security(("jwt_token" = [])),
    params(("user_id" = i32, Path, description = "Staff member's user ID")),
    responses(
        (status = 200, description = "Staff membership revoked"),
        (status = 403, description = "Missing capability", body = AppError),
        (status = 404, description = "Not a staff member", body = AppError),
    ),
    tag = "admin"
)]
pub async fn revoke_staff(
    Extension(db): Extension<DatabaseConnection>,
    caller: CallerContext,
    Path(user_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    StaffService::new(db).revoke(&caller, user_id).await?;
    Ok(ApiResponse::with_message((), "Staff membership revoked"))
}
