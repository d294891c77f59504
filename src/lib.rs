pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod utils;

pub use context::CallerContext;
pub use error::{AppError, AppResult};
pub use response::{ApiResponse, PaginatedResponse, PaginationQuery};

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::env;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Member routes
        crate::handlers::report::create_report,
        crate::handlers::notice::list_notices,
        crate::handlers::notice::next_notice,
        crate::handlers::notice::acknowledge_notice,
        crate::handlers::notice::submit_appeal,
        crate::handlers::notice::my_actions,
        // Report console
        crate::handlers::report::list_reports,
        crate::handlers::report::get_report,
        crate::handlers::report::review_report,
        crate::handlers::report::resolve_report,
        crate::handlers::report::dismiss_report,
        // Ledger and appeals
        crate::handlers::moderation::record_action,
        crate::handlers::moderation::list_actions,
        crate::handlers::moderation::get_action,
        crate::handlers::moderation::list_appeals,
        crate::handlers::moderation::resolve_appeal,
        crate::handlers::moderation::list_content,
        // Admin
        crate::handlers::admin::get_stats,
        crate::handlers::admin::list_staff,
        crate::handlers::admin::grant_staff,
        crate::handlers::admin::update_staff,
        crate::handlers::admin::revoke_staff,
    ),
    components(
        schemas(
            crate::response::ApiResponse<serde_json::Value>,
            crate::response::PaginatedResponse<serde_json::Value>,
            crate::response::PaginationQuery,
            crate::error::AppError,
            crate::models::ContentRef,
            crate::models::ContentType,
            crate::models::ActionType,
            crate::models::AppealStatus,
            crate::models::AppealDecision,
            crate::models::EffectState,
            crate::models::StaffRole,
            crate::models::Permissions,
            crate::delivery::Notice,
            crate::handlers::notice::NextNoticeResponse,
            crate::handlers::notice::AppealRequest,
            crate::handlers::report::CreateReportRequest,
            crate::handlers::report::ReviewReportRequest,
            crate::handlers::report::ResolveReportRequest,
            crate::handlers::report::DismissReportRequest,
            crate::handlers::report::ReportResponse,
            crate::handlers::report::ResolveReportResponse,
            crate::handlers::moderation::ActionResponse,
            crate::handlers::moderation::RecordActionRequest,
            crate::handlers::moderation::ResolveAppealRequest,
            crate::services::content::ContentItem,
            crate::services::stats::DashboardStats,
            crate::handlers::admin::StaffResponse,
            crate::handlers::admin::GrantStaffRequest,
            crate::handlers::admin::UpdateStaffRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "reports", description = "Content reports and the report queue"),
        (name = "notices", description = "Moderation notices and appeals for members"),
        (name = "moderation", description = "Moderation ledger, appeal review and content browser"),
        (name = "admin", description = "Dashboard and staff management"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Routes, docs and HTTP layers. Callers attach the `Extension`s
/// (database, moderation config, delivery tracker, optional cache).
pub fn create_app() -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db.ping().await.is_ok();
    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Moderation Center",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}
