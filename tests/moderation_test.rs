mod common;

use chrono::Duration;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::{json, Value};
use trust_safety::config::moderation::ModerationConfig;
use trust_safety::models::{
    ActionKind, Comment, ModerationAction, Post, TargetKind, User, UserRole,
};
use trust_safety::services::moderation::{ActionWarning, ApplyAction, ModerationService};
use trust_safety::AppError;

async fn apply(app: &common::TestApp, moderator_id: i32, body: Value) -> (u16, Value) {
    common::send(
        app.client
            .post(app.url("/moderation/actions"))
            .bearer_auth(common::token_for(moderator_id))
            .json(&body),
    )
    .await
}

fn request(target_type: TargetKind, target_id: i32, action: ActionKind) -> ApplyAction {
    ApplyAction {
        target_type,
        target_id,
        action,
        duration_hours: None,
        reason: None,
        notes: None,
    }
}

#[tokio::test]
async fn warning_only_records_an_action() {
    let app = common::spawn_app().await;
    let moderator = common::create_user(&app.db, "mod", UserRole::Moderator).await;
    let author = common::create_user(&app.db, "author", UserRole::User).await;
    let post = common::create_post(&app.db, author.id).await;

    let (status, body) = apply(
        &app,
        moderator.id,
        json!({ "target_type": "post", "target_id": post.id, "action": "warning", "notes": "first strike" }),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    let action = &body["data"]["action"];
    assert_eq!(action["action_type"], "warning");
    assert_eq!(action["reason"], "moderator_discretion");
    assert_eq!(action["notes"], "first strike");
    assert!(action["expires_at"].is_null());
    assert!(action["report_id"].is_null());

    let post_after = Post::find_by_id(post.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(post_after, post);
    let author_after = User::find_by_id(author.id).one(&app.db).await.unwrap().unwrap();
    assert!(!author_after.is_banned);
}

#[tokio::test]
async fn content_removal_flags_the_comment() {
    let db = common::test_db().await;
    let moderator = common::create_user(&db, "mod", UserRole::Moderator).await;
    let author = common::create_user(&db, "author", UserRole::User).await;
    let post = common::create_post(&db, author.id).await;
    let comment = common::create_comment(&db, post.id, author.id).await;

    let service = ModerationService::new(db.clone(), ModerationConfig::default());
    let outcome = service
        .apply_action(
            common::principal(&moderator),
            request(TargetKind::Comment, comment.id, ActionKind::ContentRemoval),
        )
        .await
        .unwrap();
    assert!(outcome.warning.is_none());

    let comment = Comment::find_by_id(comment.id).one(&db).await.unwrap().unwrap();
    assert!(comment.is_removed);
    assert_eq!(comment.removed_by, Some(moderator.id));
    assert_eq!(comment.removed_at, Some(outcome.action.created_at));
}

#[tokio::test]
async fn ban_on_content_lands_on_its_author() {
    let db = common::test_db().await;
    let moderator = common::create_user(&db, "mod", UserRole::Moderator).await;
    let author = common::create_user(&db, "author", UserRole::User).await;
    let post = common::create_post(&db, author.id).await;
    let comment = common::create_comment(&db, post.id, author.id).await;

    let service = ModerationService::new(db.clone(), ModerationConfig::default());
    let outcome = service
        .apply_action(
            common::principal(&moderator),
            ApplyAction {
                duration_hours: Some(24),
                reason: Some("repeated abuse".to_string()),
                ..request(TargetKind::Comment, comment.id, ActionKind::TemporaryBan)
            },
        )
        .await
        .unwrap();

    assert!(outcome.warning.is_none());
    assert_eq!(outcome.action.target_type, TargetKind::Comment);
    assert_eq!(outcome.action.target_id, comment.id);
    assert_eq!(outcome.action.subject_user_id, Some(author.id));
    assert_eq!(
        outcome.action.expires_at,
        Some(outcome.action.created_at + Duration::hours(24))
    );

    let author = User::find_by_id(author.id).one(&db).await.unwrap().unwrap();
    assert!(author.is_banned);
    assert_eq!(author.banned_until, outcome.action.expires_at);
    assert_eq!(author.ban_reason.as_deref(), Some("repeated abuse"));

    let comment = Comment::find_by_id(comment.id).one(&db).await.unwrap().unwrap();
    assert!(!comment.is_removed);
}

#[tokio::test]
async fn permanent_ban_locks_the_user_out() {
    let app = common::spawn_app().await;
    let admin = common::create_user(&app.db, "admin", UserRole::Admin).await;
    let troll = common::create_user(&app.db, "troll", UserRole::User).await;

    let (status, _) = common::send(
        app.client
            .get(app.url("/notifications"))
            .bearer_auth(common::token_for(troll.id)),
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = apply(
        &app,
        admin.id,
        json!({ "target_type": "user", "target_id": troll.id, "action": "permanent_ban", "reason": "spam ring" }),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(body["data"]["action"]["expires_at"].is_null());

    let troll_after = User::find_by_id(troll.id).one(&app.db).await.unwrap().unwrap();
    assert!(troll_after.is_banned);
    assert_eq!(troll_after.banned_until, None);

    let (status, _) = common::send(
        app.client
            .get(app.url("/notifications"))
            .bearer_auth(common::token_for(troll.id)),
    )
    .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn later_short_ban_does_not_lift_a_permanent_one() {
    let app = common::spawn_app().await;
    let admin = common::create_user(&app.db, "admin", UserRole::Admin).await;
    let troll = common::create_user(&app.db, "troll", UserRole::User).await;

    let (status, _) = apply(
        &app,
        admin.id,
        json!({ "target_type": "user", "target_id": troll.id, "action": "permanent_ban", "reason": "spam ring" }),
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = apply(
        &app,
        admin.id,
        json!({ "target_type": "user", "target_id": troll.id, "action": "temporary_ban", "duration": 1 }),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(body["data"]["warning"].is_null());

    let troll_after = User::find_by_id(troll.id).one(&app.db).await.unwrap().unwrap();
    assert!(troll_after.is_banned);
    assert_eq!(troll_after.banned_until, None);
    assert_eq!(troll_after.ban_reason.as_deref(), Some("spam ring"));
    assert_eq!(ModerationAction::find().count(&app.db).await.unwrap(), 2);
}

#[tokio::test]
async fn longer_ban_extends_a_shorter_one() {
    let db = common::test_db().await;
    let moderator = common::create_user(&db, "mod", UserRole::Moderator).await;
    let troll = common::create_user(&db, "troll", UserRole::User).await;
    let svc = ModerationService::new(db.clone(), ModerationConfig::default());

    let week = svc
        .apply_action(
            common::principal(&moderator),
            ApplyAction {
                duration_hours: Some(168),
                ..request(TargetKind::User, troll.id, ActionKind::TemporaryBan)
            },
        )
        .await
        .unwrap();
    let week_end = week.action.expires_at;

    svc.apply_action(
        common::principal(&moderator),
        ApplyAction {
            duration_hours: Some(2),
            ..request(TargetKind::User, troll.id, ActionKind::TemporaryBan)
        },
    )
    .await
    .unwrap();
    let after_short = User::find_by_id(troll.id).one(&db).await.unwrap().unwrap();
    assert_eq!(after_short.banned_until, week_end);

    let month = svc
        .apply_action(
            common::principal(&moderator),
            ApplyAction {
                duration_hours: Some(720),
                ..request(TargetKind::User, troll.id, ActionKind::TemporaryBan)
            },
        )
        .await
        .unwrap();
    let after_long = User::find_by_id(troll.id).one(&db).await.unwrap().unwrap();
    assert_eq!(after_long.banned_until, month.action.expires_at);
    assert!(after_long.banned_until > week_end);
}

#[tokio::test]
async fn ban_with_unresolvable_author_keeps_the_audit_record() {
    let app = common::spawn_app().await;
    let moderator = common::create_user(&app.db, "mod", UserRole::Moderator).await;
    let sender = common::create_user(&app.db, "sender", UserRole::User).await;
    let starter = common::create_user(&app.db, "starter", UserRole::User).await;
    let conversation = common::create_conversation(&app.db, starter.id).await;
    let message = common::create_message(&app.db, conversation.id, sender.id).await;

    // The sender's account goes away; the message stays with no author.
    User::delete_by_id(sender.id).exec(&app.db).await.unwrap();

    let (status, body) = apply(
        &app,
        moderator.id,
        json!({ "target_type": "message", "target_id": message.id, "action": "temporary_ban", "duration": 72 }),
    )
    .await;
    assert_eq!(status, 200, "{body}");
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(body["data"]["warning"]["kind"], "author_unresolved");
    assert!(body["message"].as_str().unwrap().contains("could not be resolved"));
    assert!(body["data"]["action"]["subject_user_id"].is_null());

    assert_eq!(ModerationAction::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn partial_failure_is_returned_from_the_service() {
    let db = common::test_db().await;
    let moderator = common::create_user(&db, "mod", UserRole::Moderator).await;
    let sender = common::create_user(&db, "sender", UserRole::User).await;
    let conversation = common::create_conversation(&db, sender.id).await;
    let message = common::create_message(&db, conversation.id, sender.id).await;
    User::delete_by_id(sender.id).exec(&db).await.unwrap();

    let service = ModerationService::new(db.clone(), ModerationConfig::default());
    let outcome = service
        .apply_action(
            common::principal(&moderator),
            request(TargetKind::Conversation, conversation.id, ActionKind::PermanentBan),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome.warning,
        Some(ActionWarning::AuthorUnresolved {
            target_type: TargetKind::Conversation,
            target_id: conversation.id,
        })
    );
    assert!(outcome.action.is_active);

    // Warnings on a message need no author at all.
    let outcome = service
        .apply_action(
            common::principal(&moderator),
            request(TargetKind::Message, message.id, ActionKind::Warning),
        )
        .await
        .unwrap();
    assert!(outcome.warning.is_none());
}

#[tokio::test]
async fn removal_is_unsupported_on_non_content_targets() {
    let app = common::spawn_app().await;
    let moderator = common::create_user(&app.db, "mod", UserRole::Moderator).await;
    let someone = common::create_user(&app.db, "someone", UserRole::User).await;
    let conversation = common::create_conversation(&app.db, someone.id).await;
    let message = common::create_message(&app.db, conversation.id, someone.id).await;

    for (target_type, target_id) in [
        ("user", someone.id),
        ("message", message.id),
        ("conversation", conversation.id),
    ] {
        let (status, body) = apply(
            &app,
            moderator.id,
            json!({ "target_type": target_type, "target_id": target_id, "action": "content_removal" }),
        )
        .await;
        assert_eq!(status, 422, "{target_type}: {body}");
        assert_eq!(
            body["error"],
            format!("content_removal cannot be applied to a {target_type}")
        );
    }

    assert_eq!(ModerationAction::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_writing() {
    let app = common::spawn_app().await;
    let moderator = common::create_user(&app.db, "mod", UserRole::Moderator).await;
    let user = common::create_user(&app.db, "user", UserRole::User).await;
    let author = common::create_user(&app.db, "author", UserRole::User).await;
    let post = common::create_post(&app.db, author.id).await;

    let cases = [
        (user.id, json!({ "target_type": "post", "target_id": post.id, "action": "warning" }), 403),
        (moderator.id, json!({ "target_type": "post", "target_id": 9999, "action": "warning" }), 404),
        (moderator.id, json!({ "target_type": "post", "target_id": post.id, "action": "none" }), 400),
        (moderator.id, json!({ "target_type": "post", "target_id": post.id, "action": "temporary_ban" }), 400),
        (moderator.id, json!({ "target_type": "post", "target_id": post.id, "action": "temporary_ban", "duration": 0 }), 400),
        (moderator.id, json!({ "target_type": "post", "target_id": post.id, "action": "permanent_ban", "duration": 10 }), 400),
        (moderator.id, json!({ "target_type": "post", "target_id": post.id, "action": "shadow_ban" }), 400),
    ];

    for (caller, body, expected) in cases {
        let (status, response) = apply(&app, caller, body.clone()).await;
        assert_eq!(status, expected, "{body} -> {response}");
    }

    assert_eq!(ModerationAction::find().count(&app.db).await.unwrap(), 0);
    let author_after = User::find_by_id(author.id).one(&app.db).await.unwrap().unwrap();
    assert!(!author_after.is_banned);
}

#[tokio::test]
async fn ban_ceiling_comes_from_config() {
    let db = common::test_db().await;
    let moderator = common::create_user(&db, "mod", UserRole::Moderator).await;
    let target = common::create_user(&db, "target", UserRole::User).await;

    let service = ModerationService::new(
        db.clone(),
        ModerationConfig {
            max_ban_hours: 24,
            ..Default::default()
        },
    );
    let err = service
        .apply_action(
            common::principal(&moderator),
            ApplyAction {
                duration_hours: Some(25),
                ..request(TargetKind::User, target.id, ActionKind::TemporaryBan)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn audit_history_is_staff_only_and_newest_first() {
    let app = common::spawn_app().await;
    let moderator = common::create_user(&app.db, "mod", UserRole::Moderator).await;
    let author = common::create_user(&app.db, "author", UserRole::User).await;
    let post = common::create_post(&app.db, author.id).await;

    for action in ["warning", "content_removal"] {
        let (status, _) = apply(
            &app,
            moderator.id,
            json!({ "target_type": "post", "target_id": post.id, "action": action }),
        )
        .await;
        assert_eq!(status, 200);
    }

    let path = format!("/moderation/actions?target_type=post&target_id={}", post.id);
    let (status, body) = common::send(
        app.client
            .get(app.url(&path))
            .bearer_auth(common::token_for(moderator.id)),
    )
    .await;
    assert_eq!(status, 200);
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action_type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["content_removal", "warning"]);

    let (status, _) = common::send(
        app.client
            .get(app.url(&path))
            .bearer_auth(common::token_for(author.id)),
    )
    .await;
    assert_eq!(status, 403);
}
