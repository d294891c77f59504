mod common;

use chrono::TimeDelta;
use common::*;
use modcenter::models::{AccountStatus, ContentRef, ContentType, StaffRole};
use modcenter::services::effects::{Effect, EffectApplier};
use serde_json::json;

async fn approve(app: &TestApp, admin: i32, subject: i32, action_id: i64) -> serde_json::Value {
    let (status, body) = app
        .post(
            &token(subject),
            &format!("/moderation/actions/{}/appeal", action_id),
            json!({ "text": APPEAL_TEXT }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);

    let (status, body) = app
        .put(
            &token(admin),
            &format!("/admin/moderation/appeals/{}/resolve", action_id),
            json!({ "decision": "approved" }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    body["data"].clone()
}

#[tokio::test]
async fn test_suspension_sets_window_and_reverses_on_approval() {
    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let admin = seed_staff(&app.db, StaffRole::Admin).await;

    let before = chrono::Utc::now().naive_utc();
    let action = record(
        &app,
        &token(admin),
        json!({ "user_id": user, "action_type": "suspension_24h", "reason": "flooding" }),
    )
    .await;
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Suspended);

    let until = chrono::NaiveDateTime::parse_from_str(
        action["suspension_until"].as_str().unwrap(),
        "%Y-%m-%d %H:%M:%S%.f",
    )
    .unwrap();
    let expected = before + TimeDelta::hours(24);
    assert!((until - expected).num_seconds().abs() < 5);

    let decided = approve(&app, admin, user, action["id"].as_i64().unwrap()).await;
    assert_eq!(decided["effect_state"], "reversed");
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Active);
}

#[tokio::test]
async fn test_reactivation_skipped_while_another_restriction_holds() {
    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let admin = seed_staff(&app.db, StaffRole::Admin).await;

    let suspension = record(
        &app,
        &token(admin),
        json!({ "user_id": user, "action_type": "suspension_7d", "reason": "flooding" }),
    )
    .await;
    record(
        &app,
        &token(admin),
        json!({ "user_id": user, "action_type": "ban", "reason": "ban evasion" }),
    )
    .await;
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Banned);

    let decided = approve(&app, admin, user, suspension["id"].as_i64().unwrap()).await;
    assert_eq!(decided["appeal_status"], "approved");
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Banned);
}

#[tokio::test]
async fn test_suspension_does_not_downgrade_ban() {
    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let admin = seed_staff(&app.db, StaffRole::Admin).await;

    record(
        &app,
        &token(admin),
        json!({ "user_id": user, "action_type": "ban", "reason": "spam ring" }),
    )
    .await;
    record(
        &app,
        &token(admin),
        json!({ "user_id": user, "action_type": "suspension_30d", "reason": "more spam" }),
    )
    .await;
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Banned);
}

#[tokio::test]
async fn test_approved_deletion_has_nothing_to_restore() {
    let app = spawn_app().await;
    let author = seed_user(&app.db, "author").await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;
    let post_id = create_post(&app.db, author).await;

    let action = record(
        &app,
        &token(moderator),
        json!({
            "action_type": "content_deleted",
            "reason": "doxxing",
            "content_type": "post",
            "content_id": post_id,
        }),
    )
    .await;
    assert!(find_post(&app.db, post_id).await.is_none());

    let decided = approve(&app, moderator, author, action["id"].as_i64().unwrap()).await;
    assert_eq!(decided["effect_state"], "reversed");
    assert!(find_post(&app.db, post_id).await.is_none());
}

#[tokio::test]
async fn test_comment_shadowban_round_trip_is_idempotent() {
    let app = spawn_app().await;
    let author = seed_user(&app.db, "author").await;
    let post_id = create_post(&app.db, author).await;
    let comment_id = create_comment(&app.db, post_id, author).await;
    let content = ContentRef::new(ContentType::Comment, comment_id);
    let applier = EffectApplier::new(app.db.clone());

    let hide = Effect::HideContent {
        content,
        reason: "insults".to_string(),
    };
    applier.apply(&hide).await.unwrap();
    applier.apply(&hide).await.unwrap();

    let restore = Effect::RestoreContent { content };
    applier.apply(&restore).await.unwrap();
    applier.apply(&restore).await.unwrap();

    use sea_orm::EntityTrait;
    let comment = modcenter::models::Comment::find_by_id(comment_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert!(!comment.hidden);
    assert!(comment.shadowbanned_reason.is_none());
    assert!(comment.shadowbanned_at.is_none());

    // Restoring something that is gone is a no-op.
    applier
        .apply(&Effect::RestoreContent {
            content: ContentRef::new(ContentType::Post, 4040),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_moderator_cannot_approve_ban_appeal() {
    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let admin = seed_staff(&app.db, StaffRole::Admin).await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;

    let ban = record(
        &app,
        &token(admin),
        json!({ "user_id": user, "action_type": "ban", "reason": "threats" }),
    )
    .await;
    let id = ban["id"].as_i64().unwrap();
    app.post(
        &token(user),
        &format!("/moderation/actions/{}/appeal", id),
        json!({ "text": APPEAL_TEXT }),
    )
    .await;

    let resolve = format!("/admin/moderation/appeals/{}/resolve", id);
    let (status, _) = app
        .put(&token(moderator), &resolve, json!({ "decision": "approved" }))
        .await;
    assert_eq!(status, 403);

    let (status, _) = app
        .put(&token(moderator), &resolve, json!({ "decision": "rejected" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Banned);
}

#[tokio::test]
async fn test_moderated_content_listing_tracks_visibility() {
    let app = spawn_app().await;
    let author = seed_user(&app.db, "author").await;
    let moderator = seed_staff(&app.db, StaffRole::Moderator).await;
    let hidden = create_post(&app.db, author).await;
    let shown = create_post(&app.db, author).await;
    let comment_id = create_comment(&app.db, shown, author).await;
    let t = token(moderator);

    let action = record(
        &app,
        &t,
        json!({
            "action_type": "content_shadowban",
            "reason": "spam",
            "content_type": "post",
            "content_id": hidden,
        }),
    )
    .await;
    // The owner becomes the subject of a content action.
    assert_eq!(action["user_id"], author);

    let (status, body) = app
        .get(&t, "/admin/moderation/content?shadowbanned=true")
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["total"], 1);
    let item = &body["data"]["items"][0];
    assert_eq!(item["id"], hidden);
    assert_eq!(item["visible"], false);
    assert_eq!(item["shadowbanned_reason"], "spam");

    let (_, body) = app.get(&t, "/admin/moderation/content?visible=true").await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], shown);

    let (_, body) = app
        .get(&t, "/admin/moderation/content?content_type=comment&visible=true")
        .await;
    assert_eq!(body["data"]["items"][0]["id"], comment_id);
    assert_eq!(body["data"]["items"][0]["content_type"], "comment");

    let (status, _) = app
        .get(&t, "/admin/moderation/content?content_type=video")
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_approved_ban_falls_back_to_running_suspension() {
    use modcenter::models::{moderation_action, ModerationAction};
    use modcenter::services::maintenance::MaintenanceService;
    use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};

    let app = spawn_app().await;
    let user = seed_user(&app.db, "member").await;
    let admin = seed_staff(&app.db, StaffRole::Admin).await;

    let suspension = record(
        &app,
        &token(admin),
        json!({ "user_id": user, "action_type": "suspension_24h", "reason": "flooding" }),
    )
    .await;
    let ban = record(
        &app,
        &token(admin),
        json!({ "user_id": user, "action_type": "ban", "reason": "ban evasion" }),
    )
    .await;
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Banned);

    let decided = approve(&app, admin, user, ban["id"].as_i64().unwrap()).await;
    assert_eq!(decided["effect_state"], "reversed");
    // The ban is lifted; the suspension still runs.
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Suspended);

    let sweep = MaintenanceService::new(app.db.clone(), std::time::Duration::from_secs(30));
    assert_eq!(sweep.lift_expired_suspensions().await.unwrap(), 0);

    let id = suspension["id"].as_i64().unwrap() as i32;
    let row = ModerationAction::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let mut expired: moderation_action::ActiveModel = row.into();
    expired.suspension_until = Set(Some(chrono::Utc::now().naive_utc() - TimeDelta::minutes(1)));
    expired.update(&app.db).await.unwrap();

    assert_eq!(sweep.lift_expired_suspensions().await.unwrap(), 1);
    assert_eq!(account_status(&app.db, user).await, AccountStatus::Active);
}
