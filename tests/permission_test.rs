mod common;

use common::*;
use modcenter::models::{AccountStatus, StaffRole};
use serde_json::json;

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = spawn_app().await;

    let resp = app
        .client
        .get(app.url("/moderation/notices"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let (status, _) = app.get("not-a-jwt", "/moderation/notices").await;
    assert_eq!(status, 401);

    // Valid signature, but the account does not exist.
    let (status, _) = app.get(&token(424242), "/moderation/notices").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_members_are_kept_out_of_the_console() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, "member").await;
    let t = token(member);

    for path in [
        "/admin/reports",
        "/admin/moderation/actions",
        "/admin/moderation/appeals",
        "/admin/moderation/content",
        "/admin/stats",
        "/admin/staff",
    ] {
        let (status, _) = app.get(&t, path).await;
        assert_eq!(status, 403, "{}", path);
    }

    let (status, _) = app
        .post(
            &t,
            "/admin/moderation/actions",
            json!({ "user_id": member, "action_type": "warning", "reason": "self-warn" }),
        )
        .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_moderator_cannot_suspend_or_ban() {
    let app = spawn_app().await;
    let target = seed_user(&app.db, "target").await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;

    for action_type in ["suspension_24h", "ban"] {
        let (status, _) = app
            .post(
                &token(moderator),
                "/admin/moderation/actions",
                json!({ "user_id": target, "action_type": action_type, "reason": "abuse" }),
            )
            .await;
        assert_eq!(status, 403);
    }

    // Nothing was written and the account is untouched.
    let (_, body) = app
        .get(
            &token(moderator),
            &format!("/admin/moderation/actions?user_id={}", target),
        )
        .await;
    assert_eq!(body["data"]["total"], 0);
    assert_eq!(account_status(&app.db, target).await, AccountStatus::Active);

    let (status, _) = app
        .post(
            &token(moderator),
            "/admin/moderation/actions",
            json!({ "user_id": target, "action_type": "warning", "reason": "tone it down" }),
        )
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_unknown_action_type_and_missing_targets() {
    let app = spawn_app().await;
    let target = seed_user(&app.db, "target").await;
    let admin = seed_staff(&app.db, StaffRole::Admin).await;
    let t = token(admin);

    let (status, body) = app
        .post(
            &t,
            "/admin/moderation/actions",
            json!({ "user_id": target, "action_type": "exile", "reason": "x" }),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("InvalidActionType"));

    // Account actions need a user, content actions need content.
    let (status, _) = app
        .post(
            &t,
            "/admin/moderation/actions",
            json!({ "action_type": "ban", "reason": "x" }),
        )
        .await;
    assert_eq!(status, 400);
    let (status, _) = app
        .post(
            &t,
            "/admin/moderation/actions",
            json!({ "user_id": target, "action_type": "content_shadowban", "reason": "x" }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .post(
            &t,
            "/admin/moderation/actions",
            json!({ "user_id": 98765, "action_type": "warning", "reason": "x" }),
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_restricted_accounts_still_reach_their_notices() {
    let app = spawn_app().await;
    let target = seed_user(&app.db, "target").await;
    let admin = seed_staff(&app.db, StaffRole::Admin).await;

    record(
        &app,
        &token(admin),
        json!({ "user_id": target, "action_type": "ban", "reason": "ban evasion" }),
    )
    .await;
    assert_eq!(account_status(&app.db, target).await, AccountStatus::Banned);

    let (status, body) = app.get(&token(target), "/moderation/notices").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"][0]["title"], "Account banned");
    assert_eq!(body["data"][0]["can_appeal"], true);
}
