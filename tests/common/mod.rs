#![allow(dead_code)]

use reqwest::Client;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Once;
use trust_safety::config::{moderation::ModerationConfig, rate_limit::RateLimitConfig};
use trust_safety::models::{
    comment, conversation, message, post, report, user, ActionKind, CommentModel,
    ConversationModel, Evidence, MessageModel, PostModel, Priority, ReportModel, ReportReason,
    ReportStatus, TargetKind, TargetSnapshot, UserModel, UserRole,
};
use trust_safety::websocket::hub::NotificationHub;
use trust_safety::AuthUser;

static INIT: Once = Once::new();

fn init_env() {
    INIT.call_once(|| {
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("ENABLE_HSTS", "false");
        let config = trust_safety::config::jwt::JwtConfig::from_env().unwrap();
        let _ = trust_safety::utils::jwt::init_jwt_config(config);
    });
}

/// Fresh in-memory database with all migrations applied.
///
/// An in-memory SQLite database lives and dies with its connection, so the
/// pool is pinned to exactly one.
pub async fn test_db() -> DatabaseConnection {
    init_env();

    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("Failed to open in-memory database");
    trust_safety::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub hub: NotificationHub,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(ModerationConfig::default()).await
}

pub async fn spawn_app_with(moderation: ModerationConfig) -> TestApp {
    let db = test_db().await;
    let hub = NotificationHub::new();

    let app = trust_safety::create_app(trust_safety::AppContext {
        db: db.clone(),
        hub: hub.clone(),
        moderation,
        rate_limit: RateLimitConfig {
            enabled: false,
            ..Default::default()
        },
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        hub,
        client: Client::new(),
    }
}

pub fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

pub fn token_for(user_id: i32) -> String {
    init_env();
    trust_safety::utils::jwt::encode_access_token(user_id).expect("Failed to mint token")
}

pub fn principal(user: &UserModel) -> AuthUser {
    AuthUser {
        user_id: user.id,
        role: user.role,
    }
}

pub async fn create_user(db: &DatabaseConnection, username: &str, role: UserRole) -> UserModel {
    user::ActiveModel {
        username: Set(username.to_string()),
        role: Set(role),
        is_banned: Set(false),
        banned_until: Set(None),
        ban_reason: Set(None),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user")
}

pub async fn create_post(db: &DatabaseConnection, author_id: i32) -> PostModel {
    post::ActiveModel {
        user_id: Set(author_id),
        title: Set("A post".to_string()),
        content: Set("Some content that may or may not break the rules".to_string()),
        is_removed: Set(false),
        removed_at: Set(None),
        removed_by: Set(None),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create post")
}

pub async fn create_comment(db: &DatabaseConnection, post_id: i32, author_id: i32) -> CommentModel {
    comment::ActiveModel {
        post_id: Set(post_id),
        user_id: Set(author_id),
        content: Set("A reply".to_string()),
        is_removed: Set(false),
        removed_at: Set(None),
        removed_by: Set(None),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create comment")
}

pub async fn create_conversation(db: &DatabaseConnection, created_by: i32) -> ConversationModel {
    conversation::ActiveModel {
        created_by: Set(Some(created_by)),
        title: Set(Some("Direct messages".to_string())),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create conversation")
}

pub async fn create_message(
    db: &DatabaseConnection,
    conversation_id: i32,
    sender_id: i32,
) -> MessageModel {
    message::ActiveModel {
        conversation_id: Set(conversation_id),
        sender_id: Set(Some(sender_id)),
        content: Set("hello there".to_string()),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create message")
}

/// Insert a report row directly, bypassing intake. Used to build reporter
/// history; the targets need not exist.
pub async fn insert_report(
    db: &DatabaseConnection,
    reporter_id: i32,
    target_id: i32,
    status: ReportStatus,
) -> Result<ReportModel, sea_orm::DbErr> {
    report::ActiveModel {
        reporter_id: Set(reporter_id),
        target_type: Set(TargetKind::Post),
        target_id: Set(target_id),
        reason: Set(ReportReason::Spam),
        description: Set(None),
        evidence: Set(Evidence::default()),
        priority: Set(Priority::Low),
        status: Set(status),
        moderator_id: Set(None),
        moderator_notes: Set(None),
        action: Set(ActionKind::None),
        action_taken_at: Set(None),
        action_expires_at: Set(None),
        target_data: Set(TargetSnapshot::Post {
            id: target_id,
            author_id: reporter_id,
            title: "seeded".to_string(),
            excerpt: String::new(),
            is_removed: false,
        }),
        version: Set(1),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Give a reporter a decided history of `resolved` + `dismissed` reports.
pub async fn seed_history(db: &DatabaseConnection, reporter_id: i32, resolved: usize, dismissed: usize) {
    let statuses = std::iter::repeat(ReportStatus::Resolved)
        .take(resolved)
        .chain(std::iter::repeat(ReportStatus::Dismissed).take(dismissed));
    for (i, status) in statuses.enumerate() {
        insert_report(db, reporter_id, 100_000 + i as i32, status)
            .await
            .expect("Failed to seed report");
    }
}

/// Send a JSON request and return (status, body).
pub async fn send(request: reqwest::RequestBuilder) -> (u16, Value) {
    let resp = request.send().await.expect("Request failed");
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}
