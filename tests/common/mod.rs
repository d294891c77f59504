#![allow(dead_code)]

use modcenter::config::moderation::ModerationConfig;
use modcenter::delivery::tracker::DeliveryTracker;
use modcenter::models::{admin_user::ActiveModel as StaffActiveModel, comment, post, user};
use modcenter::models::{AccountStatus, StaffRole};
use reqwest::Client;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn init_env() {
    INIT.call_once(|| {
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        let config = modcenter::config::jwt::JwtConfig::from_env().unwrap();
        let _ = modcenter::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
    pub config: ModerationConfig,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    pub async fn get(&self, token: &str, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(resp).await
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(resp).await
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(resp).await
    }

    pub async fn delete(&self, token: &str, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(resp).await
    }
}

async fn read(resp: reqwest::Response) -> (u16, Value) {
    let status = resp.status().as_u16();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Fresh in-memory database with the schema applied.
pub async fn test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opt)
        .await
        .expect("Failed to open in-memory database");
    modcenter::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub fn test_config() -> ModerationConfig {
    ModerationConfig {
        notice_next_delay: Duration::from_millis(300),
        notice_poll_interval: Duration::from_millis(200),
        ..ModerationConfig::default()
    }
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let db = test_db().await;
    let config = test_config();

    let app = modcenter::create_app()
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(config.clone()))
        .layer(axum::extract::Extension(DeliveryTracker::new(
            config.notice_next_delay,
        )));

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
        client: Client::new(),
        config,
    }
}

pub fn token(user_id: i32) -> String {
    init_env();
    modcenter::utils::jwt::encode_access_token(user_id).unwrap()
}

/// Insert a member account and return its id.
pub async fn seed_user(db: &DatabaseConnection, prefix: &str) -> i32 {
    let n = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let now = chrono::Utc::now().naive_utc();
    let saved = user::ActiveModel {
        username: Set(format!("{}_{}", prefix, n)),
        email: Set(format!("{}_{}@test.com", prefix, n)),
        account_status: Set(AccountStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    saved.id
}

/// Insert a user holding `role` with the role's default permissions.
pub async fn seed_staff(db: &DatabaseConnection, role: StaffRole) -> i32 {
    let id = seed_user(db, "staff").await;
    let perms = role.default_permissions();
    let now = chrono::Utc::now().naive_utc();
    StaffActiveModel {
        user_id: Set(id),
        role: Set(role),
        can_view_reports: Set(perms.can_view_reports),
        can_moderate: Set(perms.can_moderate),
        can_ban: Set(perms.can_ban),
        can_delete_content: Set(perms.can_delete_content),
        can_manage_admins: Set(perms.can_manage_admins),
        created_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn create_post(db: &DatabaseConnection, owner: i32) -> i32 {
    post::ActiveModel {
        user_id: Set(Some(owner)),
        content: Set("buy cheap watches at example dot com".to_string()),
        published: Set(true),
        shadowbanned: Set(false),
        shadowbanned_reason: Set(None),
        shadowbanned_at: Set(None),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn create_comment(db: &DatabaseConnection, post_id: i32, owner: i32) -> i32 {
    comment::ActiveModel {
        post_id: Set(post_id),
        user_id: Set(Some(owner)),
        content: Set("you are all idiots".to_string()),
        hidden: Set(false),
        shadowbanned_reason: Set(None),
        shadowbanned_at: Set(None),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn account_status(db: &DatabaseConnection, user_id: i32) -> AccountStatus {
    use sea_orm::EntityTrait;
    modcenter::models::User::find_by_id(user_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .account_status
}

pub async fn find_post(db: &DatabaseConnection, id: i32) -> Option<modcenter::models::PostModel> {
    use sea_orm::EntityTrait;
    modcenter::models::Post::find_by_id(id).one(db).await.unwrap()
}

/// Record an action through the console API and return the response data.
pub async fn record(app: &TestApp, moderator_token: &str, body: Value) -> Value {
    let (status, body) = app
        .post(moderator_token, "/admin/moderation/actions", body)
        .await;
    assert_eq!(status, 200, "record action failed: {}", body);
    body["data"].clone()
}

pub const APPEAL_TEXT: &str = "This was a joke between friends, please take another look.";
