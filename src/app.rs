use crate::config::{moderation::ModerationConfig, rate_limit::RateLimitConfig};
use crate::routes;
use crate::websocket::hub::NotificationHub;
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
        // Report routes
        crate::handlers::report::create_report,
        crate::handlers::report::list_reports,
        crate::handlers::report::get_report,
        crate::handlers::report::update_report,
        crate::handlers::report::delete_report,
        crate::handlers::report::report_stats,
        // Moderation routes
        crate::handlers::moderation::apply_action,
        crate::handlers::moderation::list_actions,
        // Notification routes
        crate::handlers::notification::list_notifications,
        crate::handlers::notification::unread_count,
        crate::handlers::notification::mark_all_read,
        crate::handlers::notification::mark_read,
    ),
    components(
        schemas(
            crate::response::ApiResponse<serde_json::Value>,
            crate::response::PaginatedResponse<serde_json::Value>,
            crate::response::PaginationQuery,
            crate::error::AppError,
            crate::models::TargetKind,
            crate::models::ReportReason,
            crate::models::Priority,
            crate::models::ReportStatus,
            crate::models::ActionKind,
            crate::models::NotificationKind,
            // Report
            crate::handlers::report::CreateReportRequest,
            crate::handlers::report::UpdateReportRequest,
            crate::handlers::report::ReportResponse,
            crate::handlers::report::UpdateReportResponse,
            crate::services::report::ReportStats,
            // Moderation
            crate::handlers::moderation::ApplyActionRequest,
            crate::handlers::moderation::ApplyActionResponse,
            crate::handlers::moderation::ModerationActionResponse,
            crate::services::moderation::ActionWarning,
            // Notification
            crate::handlers::notification::NotificationResponse,
            crate::handlers::notification::UnreadCountResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "reports", description = "Report intake and triage"),
        (name = "moderation", description = "Enforcement actions and audit trail"),
        (name = "notifications", description = "Notification operations"),
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

/// Everything the router needs from startup.
#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseConnection,
    pub hub: NotificationHub,
    pub moderation: ModerationConfig,
    pub rate_limit: RateLimitConfig,
}

pub fn build_cors_layer() -> CorsLayer {
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

pub fn create_app(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes(&ctx.rate_limit))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(Extension(ctx.db))
        .layer(Extension(ctx.hub))
        .layer(Extension(ctx.moderation))
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
        "service": "Trust & Safety API",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}
