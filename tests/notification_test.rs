mod common;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::{json, Value};
use trust_safety::models::{
    notification, Notification, NotificationKind, NotificationPayload, Priority, ReportReason,
    TargetKind, UserRole,
};

#[tokio::test]
async fn intake_fans_out_to_staff_except_the_reporter() {
    let app = common::spawn_app().await;
    let moderator = common::create_user(&app.db, "mod", UserRole::Moderator).await;
    let reporting_mod = common::create_user(&app.db, "mod2", UserRole::Moderator).await;
    let admin = common::create_user(&app.db, "admin", UserRole::Admin).await;
    let bystander = common::create_user(&app.db, "bystander", UserRole::User).await;
    let author = common::create_user(&app.db, "author", UserRole::User).await;
    let comment_post = common::create_post(&app.db, author.id).await;
    let comment = common::create_comment(&app.db, comment_post.id, author.id).await;

    let (status, body) = common::send(
        app.client
            .post(app.url("/reports"))
            .bearer_auth(common::token_for(reporting_mod.id))
            .json(&json!({ "target_type": "comment", "target_id": comment.id, "reason": "hate_speech" })),
    )
    .await;
    assert_eq!(status, 200);
    let report_id = body["data"]["id"].as_i64().unwrap() as i32;

    let records = Notification::find()
        .order_by_asc(notification::Column::UserId)
        .all(&app.db)
        .await
        .unwrap();
    let recipients: Vec<i32> = records.iter().map(|n| n.user_id).collect();
    assert_eq!(recipients, vec![moderator.id, admin.id]);
    assert!(!recipients.contains(&bystander.id));

    for record in &records {
        assert_eq!(record.kind, NotificationKind::ReportSubmitted);
        assert!(!record.is_read);
        assert_eq!(
            record.payload,
            NotificationPayload::ReportSubmitted {
                report_id,
                target_type: TargetKind::Comment,
                target_id: comment.id,
                reason: ReportReason::HateSpeech,
                priority: Priority::High,
            }
        );
    }
}

#[tokio::test]
async fn connected_moderators_get_a_live_push() {
    let app = common::spawn_app().await;
    let moderator = common::create_user(&app.db, "mod", UserRole::Moderator).await;
    let reporter = common::create_user(&app.db, "reporter", UserRole::User).await;
    let author = common::create_user(&app.db, "author", UserRole::User).await;
    let post = common::create_post(&app.db, author.id).await;

    let (_conn_id, mut rx) = app.hub.subscribe(moderator.id);

    let (status, _) = common::send(
        app.client
            .post(app.url("/reports"))
            .bearer_auth(common::token_for(reporter.id))
            .json(&json!({ "target_type": "post", "target_id": post.id, "reason": "privacy" })),
    )
    .await;
    assert_eq!(status, 200);

    let pushed = rx.try_recv().expect("moderator should have been pushed a notification");
    let event: Value = serde_json::from_str(&pushed).unwrap();
    assert_eq!(event["type"], "notification");
    assert_eq!(event["data"]["user_id"], moderator.id);
    assert_eq!(event["data"]["payload"]["kind"], "report_submitted");
    assert_eq!(event["data"]["payload"]["priority"], "medium");
}

#[tokio::test]
async fn resolution_notifies_only_the_reporter() {
    let app = common::spawn_app().await;
    let moderator = common::create_user(&app.db, "mod", UserRole::Moderator).await;
    let reporter = common::create_user(&app.db, "reporter", UserRole::User).await;
    let author = common::create_user(&app.db, "author", UserRole::User).await;
    let post = common::create_post(&app.db, author.id).await;

    let (_, body) = common::send(
        app.client
            .post(app.url("/reports"))
            .bearer_auth(common::token_for(reporter.id))
            .json(&json!({ "target_type": "post", "target_id": post.id, "reason": "spam" })),
    )
    .await;
    let report_id = body["data"]["id"].as_i64().unwrap() as i32;

    let (status, _) = common::send(
        app.client
            .put(app.url(&format!("/reports/{report_id}")))
            .bearer_auth(common::token_for(moderator.id))
            .json(&json!({ "status": "resolved", "action": "content_removal" })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = common::send(
        app.client
            .get(app.url("/notifications"))
            .bearer_auth(common::token_for(reporter.id)),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 1);
    let item = &body["data"]["items"][0];
    assert_eq!(item["kind"], "report_resolved");
    assert_eq!(item["payload"]["report_id"], report_id);
    assert_eq!(item["payload"]["status"], "resolved");
    assert_eq!(item["payload"]["action"], "content_removal");

    // The moderator only has the intake notice.
    let moderator_notes = Notification::find()
        .filter(notification::Column::UserId.eq(moderator.id))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(moderator_notes.len(), 1);
    assert_eq!(moderator_notes[0].kind, NotificationKind::ReportSubmitted);
}

#[tokio::test]
async fn read_state_is_per_recipient() {
    let app = common::spawn_app().await;
    let first_mod = common::create_user(&app.db, "mod1", UserRole::Moderator).await;
    let second_mod = common::create_user(&app.db, "mod2", UserRole::Moderator).await;
    let reporter = common::create_user(&app.db, "reporter", UserRole::User).await;
    let author = common::create_user(&app.db, "author", UserRole::User).await;

    for _ in 0..3 {
        let post = common::create_post(&app.db, author.id).await;
        let (status, _) = common::send(
            app.client
                .post(app.url("/reports"))
                .bearer_auth(common::token_for(reporter.id))
                .json(&json!({ "target_type": "post", "target_id": post.id, "reason": "spam" })),
        )
        .await;
        assert_eq!(status, 200);
    }

    let token = common::token_for(first_mod.id);
    let (_, body) = common::send(
        app.client
            .get(app.url("/notifications/unread-count"))
            .bearer_auth(&token),
    )
    .await;
    assert_eq!(body["data"]["count"], 3);

    let (_, body) = common::send(
        app.client
            .get(app.url("/notifications?per_page=2"))
            .bearer_auth(&token),
    )
    .await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["total_pages"], 2);
    let first_id = body["data"]["items"][0]["id"].as_i64().unwrap();

    // Someone else's notification cannot be touched.
    let (status, _) = common::send(
        app.client
            .put(app.url(&format!("/notifications/{first_id}/read")))
            .bearer_auth(common::token_for(second_mod.id)),
    )
    .await;
    assert_eq!(status, 403);

    let (status, _) = common::send(
        app.client
            .put(app.url(&format!("/notifications/{first_id}/read")))
            .bearer_auth(&token),
    )
    .await;
    assert_eq!(status, 200);

    let (_, body) = common::send(
        app.client
            .get(app.url("/notifications/unread-count"))
            .bearer_auth(&token),
    )
    .await;
    assert_eq!(body["data"]["count"], 2);

    let (_, body) = common::send(
        app.client
            .put(app.url("/notifications/read-all"))
            .bearer_auth(&token),
    )
    .await;
    assert_eq!(body["data"]["marked_read"], 2);

    // The other moderator's queue is untouched.
    let (_, body) = common::send(
        app.client
            .get(app.url("/notifications/unread-count"))
            .bearer_auth(common::token_for(second_mod.id)),
    )
    .await;
    assert_eq!(body["data"]["count"], 3);

    let (status, _) = common::send(
        app.client
            .put(app.url("/notifications/99999/read"))
            .bearer_auth(&token),
    )
    .await;
    assert_eq!(status, 404);
}
