use sea_orm_migration::MigratorTrait;
use std::env;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trust_safety::config::{
    database::{self, DatabaseConfig},
    jwt::JwtConfig,
    moderation::ModerationConfig,
    rate_limit::RateLimitConfig,
};
use trust_safety::websocket::hub::NotificationHub;
use trust_safety::{create_app, migration, utils, AppContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trust_safety=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration before doing anything else
    let (jwt_config, db_config, moderation) = validate_config()?;

    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting Trust & Safety API v{}...", env!("CARGO_PKG_VERSION"));

    let db = database::get_database(&db_config).await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let rate_limit = RateLimitConfig::from_env();
    if !rate_limit.enabled {
        tracing::warn!("Rate limiting is disabled");
    }

    let app = create_app(AppContext {
        db,
        hub: NotificationHub::new(),
        moderation,
        rate_limit,
    });

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<(JwtConfig, DatabaseConfig, ModerationConfig)> {
    let jwt_config = JwtConfig::from_env()?;
    if jwt_config.issuer.is_none() {
        tracing::warn!("JWT_ISSUER is unset, token issuer will not be checked");
    }

    let db_config = DatabaseConfig::from_env()?;

    let moderation = ModerationConfig::from_env();
    moderation.validate()?;

    Ok((jwt_config, db_config, moderation))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
