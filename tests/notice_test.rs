mod common;

use common::*;
use modcenter::models::StaffRole;
use serde_json::json;
use std::time::Duration;

async fn warn(app: &TestApp, moderator: i32, user: i32, reason: &str) -> i64 {
    let action = record(
        app,
        &token(moderator),
        json!({ "user_id": user, "action_type": "warning", "reason": reason }),
    )
    .await;
    action["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_notices_are_listed_newest_first() {
    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;

    let first = warn(&app, moderator, user, "first").await;
    let second = warn(&app, moderator, user, "second").await;
    let third = warn(&app, moderator, user, "third").await;

    let (status, body) = app.get(&token(user), "/moderation/notices").await;
    assert_eq!(status, 200);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![third, second, first]);
    assert_eq!(body["data"][0]["title"], "Warning");
    assert_eq!(body["data"][0]["reason"], "third");
}

#[tokio::test]
async fn test_acknowledge_is_idempotent_and_removes_once() {
    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;

    let older = warn(&app, moderator, user, "older").await;
    let newer = warn(&app, moderator, user, "newer").await;

    let path = format!("/moderation/notices/{}/acknowledge", newer);
    let (status, _) = app.post(&token(user), &path, json!({})).await;
    assert_eq!(status, 200);
    let (status, _) = app.post(&token(user), &path, json!({})).await;
    assert_eq!(status, 200);

    let (_, body) = app.get(&token(user), "/moderation/notices").await;
    let remaining = body["data"].as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"], older);

    let (status, _) = app
        .post(&token(user), "/moderation/notices/777/acknowledge", json!({}))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_next_notice_holds_until_answered_then_pauses() {
    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;
    let t = token(user);

    let (_, body) = app.get(&t, "/moderation/notices/next").await;
    assert!(body["data"]["notice"].is_null());
    assert!(body["data"]["retry_after_ms"].is_null());

    let older = warn(&app, moderator, user, "older").await;
    let newer = warn(&app, moderator, user, "newer").await;

    let (_, body) = app.get(&t, "/moderation/notices/next").await;
    assert_eq!(body["data"]["notice"]["id"], newer);

    // Still on screen until answered.
    let (_, body) = app.get(&t, "/moderation/notices/next").await;
    assert_eq!(body["data"]["notice"]["id"], newer);

    app.post(
        &t,
        &format!("/moderation/notices/{}/acknowledge", newer),
        json!({}),
    )
    .await;

    let (_, body) = app.get(&t, "/moderation/notices/next").await;
    assert!(body["data"]["notice"].is_null());
    let wait = body["data"]["retry_after_ms"].as_u64().unwrap();
    assert!(wait > 0 && wait <= app.config.notice_next_delay.as_millis() as u64);

    tokio::time::sleep(app.config.notice_next_delay + Duration::from_millis(50)).await;

    let (_, body) = app.get(&t, "/moderation/notices/next").await;
    assert_eq!(body["data"]["notice"]["id"], older);
}

#[tokio::test]
async fn test_my_actions_pages_through_history() {
    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;

    for i in 0..3 {
        warn(&app, moderator, user, &format!("warning {}", i)).await;
    }
    // Another member's history is not visible.
    let other = seed_user(&app.db, "other").await;
    warn(&app, moderator, other, "not yours").await;

    let (status, body) = app
        .get(&token(user), "/moderation/actions/mine?per_page=2&page=2")
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["items"][0]["reason"], "warning 0");
}
