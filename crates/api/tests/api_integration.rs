//! API integration tests.
//!
//! These drive the full router with a mock database and in-memory cache.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;

use anitrack_api::{AppState, router as api_router};
use anitrack_common::{
    MemoryCache, SharedCache,
    config::{
        Config, DatabaseConfig, JwtConfig, RecommendationConfig, RedisConfig, ServerConfig,
        SyncConfig, VerificationConfig,
    },
};
use anitrack_core::{MemoryMailer, TokenService};
use anitrack_db::entities::{privacy_setting, user};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, Value as DbValue};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tower::ServiceExt;

/// Create a test configuration.
fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            url: "http://localhost:8000".to_string(),
            site_name: "Anitrack".to_string(),
            trusted_proxies: vec!["10.0.0.1".to_string()],
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://localhost".to_string(),
            prefix: "anitrack".to_string(),
        },
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_ttl_secs: 1800,
            refresh_ttl_secs: 604_800,
        },
        email: None,
        verification: VerificationConfig::default(),
        sync: SyncConfig::default(),
        recommendation: RecommendationConfig::default(),
    }
}

fn create_test_user(id: &str, is_admin: bool, is_banned: bool) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: id.to_string(),
        username_lower: id.to_string(),
        email: Some(format!("{id}@example.com")),
        password_hash: None,
        is_admin,
        is_active: true,
        is_banned,
        ban_reason: is_banned.then(|| "spam".to_string()),
        banned_until: None,
        last_login_at: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

struct TestApp {
    router: Router,
    cache: SharedCache,
    mailer: Arc<MemoryMailer>,
    config: Config,
}

impl TestApp {
    fn new(db: MockDatabase) -> Self {
        let config = create_test_config();
        let cache: SharedCache = Arc::new(MemoryCache::new());
        let mailer = Arc::new(MemoryMailer::new());
        let state = AppState::new(
            Arc::new(db.into_connection()),
            cache.clone(),
            mailer.clone(),
            &config,
        )
        .unwrap();

        Self {
            router: api_router(state),
            cache,
            mailer,
            config,
        }
    }

    fn empty() -> Self {
        Self::new(MockDatabase::new(DatabaseBackend::Postgres))
    }

    fn access_token(&self, user_id: &str) -> String {
        TokenService::new(&self.config.jwt, self.cache.clone())
            .issue(user_id)
            .unwrap()
            .access_token
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::empty();

    let response = app.send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "300");

    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = TestApp::empty();

    let response = app.send(get("/nonexistent/endpoint")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_requires_auth() {
    let app = TestApp::empty();

    let response = app
        .send(post_json("/auth/logout", &json!({"refresh_token": "x"})))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["code"], 401);
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn test_invalid_bearer_token_is_rejected() {
    let app = TestApp::empty();

    let response = app
        .send(with_token(get("/anime/a1"), "not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = TestApp::empty();

    let response = app
        .send(
            Request::builder()
                .uri("/auth/register")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("invalid json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_blank_search_is_bad_request() {
    let app = TestApp::empty();

    let response = app.send(get("/search?q=%20")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_anime_list_rejects_bad_weekday() {
    let app = TestApp::empty();

    let response = app.send(get("/anime?weekday=9&page=2")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_code_then_rate_limited() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        // Address is not registered yet
        .append_query_results([Vec::<user::Model>::new()]);
    let app = TestApp::new(db);
    let payload = json!({"email": "New@Example.com", "purpose": "register"});

    let response = app.send(post_json("/auth/code", &payload)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let message = app.mailer.last_to("new@example.com").await.unwrap();
    assert!(message.body.chars().filter(char::is_ascii_digit).count() >= 6);

    let response = app.send(post_json("/auth/code", &payload)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn test_banned_user_is_forbidden() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("u1", false, true)]]);
    let app = TestApp::new(db);
    let token = app.access_token("u1");

    let response = app
        .send(with_token(get("/users/me/privacy"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_privacy_defaults_for_signed_in_user() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("u1", false, false)]])
        .append_query_results([Vec::<privacy_setting::Model>::new()]);
    let app = TestApp::new(db);
    let token = app.access_token("u1");

    let response = app
        .send(with_token(get("/users/me/privacy"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["watchlist"], "public");
}

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("u1", false, false)]]);
    let app = TestApp::new(db);
    let token = app.access_token("u1");

    let response = app
        .send(with_token(get("/admin/users/banned"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_sync_without_url_is_bad_request() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("admin", true, false)]]);
    let app = TestApp::new(db);
    let token = app.access_token("admin");

    let response = app
        .send(with_token(post_json("/admin/sync/season", &json!({})), &token))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_sync_unknown_job() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("admin", true, false)]]);
    let app = TestApp::new(db);
    let token = app.access_token("admin");

    let response = app
        .send(with_token(post_json("/admin/sync/monthly", &json!({})), &token))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommended_users_requires_auth() {
    let app = TestApp::empty();

    let response = app.send(get("/recommendations/users")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_recommended_users_ranked_by_shared_anime() {
    let row = |id: &str, count: i64| {
        BTreeMap::from([
            ("id", DbValue::from(id)),
            ("username", DbValue::from(id)),
            ("avatar_url", DbValue::String(None)),
            ("mutual_watch_count", DbValue::from(count)),
        ])
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("alice", false, false)]])
        .append_query_results([vec![row("carol", 2), row("bob", 1)]])
        .append_query_results([vec![BTreeMap::from([("count", DbValue::from(2_i64))])]]);
    let app = TestApp::new(db);
    let token = app.access_token("alice");

    let response = app
        .send(with_token(get("/recommendations/users?page=1&limit=5"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["limit"], 5);
    assert_eq!(body["data"]["results"][0]["username"], "carol");
    assert_eq!(body["data"]["results"][0]["mutual_watch_count"], 2);
    assert_eq!(body["data"]["results"][1]["mutual_watch_count"], 1);
}
