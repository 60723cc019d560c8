use super::{parse_bool_env, parse_env};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

/// Pool settings for the report store. Postgres in production; the same
/// migrations also run against SQLite.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub sql_logging: bool,
}

impl DatabaseConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable must be set"))?;

        let config = Self {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", 10),
            min_connections: parse_env("DB_MIN_CONNECTIONS", 2),
            acquire_timeout: Duration::from_secs(parse_env("DB_ACQUIRE_TIMEOUT_SECS", 5)),
            sql_logging: parse_bool_env("DB_SQL_LOGGING", false),
        };
        if config.min_connections > config.max_connections {
            anyhow::bail!("DB_MIN_CONNECTIONS must not exceed DB_MAX_CONNECTIONS");
        }
        Ok(config)
    }
}

pub async fn get_database(config: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(config.sql_logging);

    Ok(Database::connect(opt).await?)
}
