use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::{auth::auth_middleware, security::security_headers_middleware};
use crate::websocket;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes(rate_limit: &RateLimitConfig) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(rate_limit))
        // WebSocket route (auth handled inside the handler via query token)
        .route("/ws", routing::get(websocket::session::ws_handler))
}

fn api_routes(config: &RateLimitConfig) -> Router {
    intake_routes(config)
        .merge(moderation_routes(config))
        .merge(read_routes(config))
        .layer(middleware::from_fn(auth_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

/// Report submission.
fn intake_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new().route("/reports", routing::post(handlers::report::create_report));

    with_optional_rate_limit(router, config.enabled, config.intake)
}

/// Moderator writes and report withdrawal.
fn moderation_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/reports/{id}",
            routing::put(handlers::report::update_report).delete(handlers::report::delete_report),
        )
        .route(
            "/moderation/actions",
            routing::post(handlers::moderation::apply_action),
        );

    with_optional_rate_limit(router, config.enabled, config.moderation)
}

/// Listings, lookups and notification state.
fn read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        // Reports
        .route("/reports", routing::get(handlers::report::list_reports))
        .route("/reports/stats", routing::get(handlers::report::report_stats))
        .route("/reports/{id}", routing::get(handlers::report::get_report))
        // Moderation audit
        .route(
            "/moderation/actions",
            routing::get(handlers::moderation::list_actions),
        )
        // Notifications
        .route(
            "/notifications",
            routing::get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/unread-count",
            routing::get(handlers::notification::unread_count),
        )
        .route(
            "/notifications/read-all",
            routing::put(handlers::notification::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            routing::put(handlers::notification::mark_read),
        );

    with_optional_rate_limit(router, config.enabled, config.read)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    match GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    {
        Some(governor_conf) => router.layer(GovernorLayer::new(governor_conf)),
        None => {
            tracing::warn!(
                "Invalid rate limit rule {}:{}, route group left unlimited",
                rule.per_second,
                rule.burst_size
            );
            router
        }
    }
}
