mod common;

use common::*;
use modcenter::models::StaffRole;
use serde_json::{json, Value};

/// Shadowban a fresh post and return (author, moderator, action id, post id).
async fn shadowbanned_post(app: &TestApp) -> (i32, i32, i64, i32) {
    let author = seed_user(&app.db, "author").await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;
    let post_id = create_post(&app.db, author).await;

    let action = record(
        app,
        &token(moderator),
        json!({
            "action_type": "content_shadowban",
            "reason": "spam",
            "content_type": "post",
            "content_id": post_id,
        }),
    )
    .await;
    // The content owner becomes the subject.
    assert_eq!(action["user_id"], author);
    (author, moderator, action["id"].as_i64().unwrap(), post_id)
}

async fn appeal(app: &TestApp, user: i32, action_id: i64, text: &str) -> (u16, Value) {
    app.post(
        &token(user),
        &format!("/moderation/actions/{}/appeal", action_id),
        json!({ "text": text }),
    )
    .await
}

#[tokio::test]
async fn test_acknowledge_without_appeal_is_terminal() {
    let app = spawn_app().await;
    let (author, _, action_id, _) = shadowbanned_post(&app).await;

    let (_, body) = app.get(&token(author), "/moderation/notices").await;
    assert_eq!(body["data"][0]["id"], action_id);
    assert_eq!(body["data"][0]["can_appeal"], true);

    let path = format!("/moderation/notices/{}/acknowledge", action_id);
    let (status, body) = app.post(&token(author), &path, json!({})).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["appeal_status"], "none");

    let (_, body) = app.get(&token(author), "/moderation/notices").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_appeal_then_approve_restores_post() {
    let app = spawn_app().await;
    let (author, moderator, action_id, post_id) = shadowbanned_post(&app).await;

    let (status, body) = appeal(
        &app,
        author,
        action_id,
        "This post was about homework help, not spam, please review.",
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["appeal_status"], "pending");
    assert_eq!(body["data"]["can_appeal"], false);

    // Appealing counts as answering the notice.
    let (_, body) = app.get(&token(author), "/moderation/notices").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = app
        .get(&token(moderator), "/admin/moderation/appeals?status=pending")
        .await;
    assert_eq!(body["data"]["total"], 1);
    let version = body["data"]["items"][0]["version"].as_i64().unwrap();

    let (status, body) = app
        .put(
            &token(moderator),
            &format!("/admin/moderation/appeals/{}/resolve", action_id),
            json!({ "decision": "approved", "expected_version": version }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    let action = &body["data"];
    assert_eq!(action["appeal_status"], "approved");
    assert_eq!(
        action["appeal_response"],
        "Your appeal has been accepted. The action has been reversed."
    );
    assert!(action["appeal_resolved_at"].is_string());
    assert_eq!(action["appeal_resolved_by"], moderator);
    assert_eq!(action["user_notified"], false);
    assert_eq!(action["effect_state"], "reversed");

    let post = find_post(&app.db, post_id).await.unwrap();
    assert!(post.published);
    assert!(!post.shadowbanned);
    assert!(post.shadowbanned_reason.is_none());
    assert!(post.shadowbanned_at.is_none());

    // The decision re-arms the notice.
    let (_, body) = app.get(&token(author), "/moderation/notices").await;
    assert_eq!(body["data"][0]["id"], action_id);
    assert_eq!(body["data"][0]["appeal_status"], "approved");
}

#[tokio::test]
async fn test_short_appeal_is_rejected_without_changes() {
    let app = spawn_app().await;
    let (author, moderator, action_id, _) = shadowbanned_post(&app).await;

    let (status, body) = appeal(&app, author, action_id, "not spam!!").await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("AppealTooShort"));

    let (_, body) = app
        .get(
            &token(moderator),
            &format!("/admin/moderation/actions/{}", action_id),
        )
        .await;
    assert_eq!(body["data"]["appeal_status"], "none");
    assert!(body["data"]["appeal_text"].is_null());
    assert_eq!(body["data"]["user_notified"], false);
    assert_eq!(body["data"]["version"], 1);
}

#[tokio::test]
async fn test_appeal_transitions_only_move_forward() {
    let app = spawn_app().await;
    let (author, moderator, action_id, _) = shadowbanned_post(&app).await;

    let (status, _) = appeal(&app, author, action_id, APPEAL_TEXT).await;
    assert_eq!(status, 200);
    let (status, _) = appeal(&app, author, action_id, APPEAL_TEXT).await;
    assert_eq!(status, 409);

    let resolve = format!("/admin/moderation/appeals/{}/resolve", action_id);
    let (status, body) = app
        .put(&token(moderator), &resolve, json!({ "decision": "rejected" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        body["data"]["appeal_response"],
        "Your appeal was reviewed but not upheld."
    );
    assert_eq!(body["data"]["effect_state"], "committed");

    let (status, _) = appeal(&app, author, action_id, APPEAL_TEXT).await;
    assert_eq!(status, 409);
    let (status, _) = app
        .put(&token(moderator), &resolve, json!({ "decision": "approved" }))
        .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn test_only_the_subject_may_appeal() {
    let app = spawn_app().await;
    let (_, _, action_id, _) = shadowbanned_post(&app).await;
    let stranger = seed_user(&app.db, "stranger").await;

    let (status, _) = appeal(&app, stranger, action_id, APPEAL_TEXT).await;
    assert_eq!(status, 403);

    let (status, _) = app
        .post(
            &token(stranger),
            &format!("/moderation/notices/{}/acknowledge", action_id),
            json!({}),
        )
        .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_concurrent_appeal_decisions_do_not_both_land() {
    let app = spawn_app().await;
    let (author, first, action_id, _) = shadowbanned_post(&app).await;
    let second = seed_staff(&app.db, StaffRole::Moderator).await;

    let (status, _) = appeal(&app, author, action_id, APPEAL_TEXT).await;
    assert_eq!(status, 200);
    let (_, body) = app
        .get(
            &token(first),
            &format!("/admin/moderation/actions/{}", action_id),
        )
        .await;
    let version = body["data"]["version"].as_i64().unwrap();

    let resolve = format!("/admin/moderation/appeals/{}/resolve", action_id);
    let (first_token, second_token) = (token(first), token(second));
    let (a, b) = tokio::join!(
        app.put(
            &first_token,
            &resolve,
            json!({ "decision": "rejected", "expected_version": version })
        ),
        app.put(
            &second_token,
            &resolve,
            json!({ "decision": "approved", "expected_version": version })
        ),
    );
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [200, 409]);
}

#[tokio::test]
async fn test_restoring_content_is_not_appealable() {
    let app = spawn_app().await;
    let (author, moderator, _, post_id) = shadowbanned_post(&app).await;

    let restored = record(
        &app,
        &token(moderator),
        json!({
            "action_type": "content_restored",
            "reason": "false positive",
            "content_type": "post",
            "content_id": post_id,
        }),
    )
    .await;
    assert!(find_post(&app.db, post_id).await.unwrap().published);

    let (status, _) = appeal(&app, author, restored["id"].as_i64().unwrap(), APPEAL_TEXT).await;
    assert_eq!(status, 409);
}
