use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::auth_middleware;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    let member = member_routes(&rate_limit_config);
    let console = console_routes(&rate_limit_config);

    // Every endpoint needs an authenticated caller.
    member
        .merge(console)
        .layer(middleware::from_fn(auth_middleware))
}

/// Member-facing routes: reporting, notices, appeals, own history.
fn member_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/reports", routing::post(handlers::report::create_report))
        .route(
            "/moderation/notices",
            routing::get(handlers::notice::list_notices),
        )
        .route(
            "/moderation/notices/next",
            routing::get(handlers::notice::next_notice),
        )
        .route(
            "/moderation/notices/{id}/acknowledge",
            routing::post(handlers::notice::acknowledge_notice),
        )
        .route(
            "/moderation/actions/mine",
            routing::get(handlers::notice::my_actions),
        )
        .route(
            "/moderation/actions/{id}/appeal",
            routing::post(handlers::notice::submit_appeal),
        );

    with_optional_rate_limit(router, config.enabled, config.member)
}

/// Moderator console routes (capabilities checked in the services).
fn console_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Reports
        .route(
            "/admin/reports",
            routing::get(handlers::report::list_reports),
        )
        .route(
            "/admin/reports/{id}",
            routing::get(handlers::report::get_report),
        )
        .route(
            "/admin/reports/{id}/review",
            routing::put(handlers::report::review_report),
        )
        .route(
            "/admin/reports/{id}/resolve",
            routing::put(handlers::report::resolve_report),
        )
        .route(
            "/admin/reports/{id}/dismiss",
            routing::put(handlers::report::dismiss_report),
        )
        // Ledger
        .route(
            "/admin/moderation/actions",
            routing::get(handlers::moderation::list_actions)
                .post(handlers::moderation::record_action),
        )
        .route(
            "/admin/moderation/actions/{id}",
            routing::get(handlers::moderation::get_action),
        )
        // Appeals
        .route(
            "/admin/moderation/appeals",
            routing::get(handlers::moderation::list_appeals),
        )
        .route(
            "/admin/moderation/appeals/{id}/resolve",
            routing::put(handlers::moderation::resolve_appeal),
        )
        // Content browser
        .route(
            "/admin/moderation/content",
            routing::get(handlers::moderation::list_content),
        )
        // Dashboard and staff
        .route("/admin/stats", routing::get(handlers::admin::get_stats))
        .route(
            "/admin/staff",
            routing::get(handlers::admin::list_staff).post(handlers::admin::grant_staff),
        )
        .route(
            "/admin/staff/{user_id}",
            routing::put(handlers::admin::update_staff).delete(handlers::admin::revoke_staff),
        );

    with_optional_rate_limit(router, config.enabled, config.console)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!("Invalid rate limit rule {:?}, serving without a limit", rule);
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
