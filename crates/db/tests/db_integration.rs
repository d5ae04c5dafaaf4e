//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `anitrack_test`)
//!   `TEST_DB_PASSWORD` (default: `anitrack_test`)
//!   `TEST_DB_NAME` (default: `anitrack_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use anitrack_db::entities::{
    anime, comment::CommentScope, like::LikeTarget, user, watch_status::WatchState,
};
use anitrack_db::repositories::{
    AnimeRepository, CommentRepository, CommentUpsert, LikeRepository, UserRepository,
    WatchStatusRepository,
};
use anitrack_db::test_utils::{TestDatabase, TestDbConfig};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};
use serde_json::json;

fn new_user(id: &str, username: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(username.to_string()),
        username_lower: Set(username.to_lowercase()),
        email: Set(Some(format!("{username}@example.com"))),
        password_hash: Set(None),
        is_admin: Set(false),
        is_active: Set(true),
        is_banned: Set(false),
        ban_reason: Set(None),
        banned_until: Set(None),
        last_login_at: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

fn new_anime(id: &str, title: &str) -> anime::ActiveModel {
    anime::ActiveModel {
        id: Set(id.to_string()),
        external_id: Set(None),
        title: Set(title.to_string()),
        title_original: Set(None),
        synopsis: Set(None),
        cover_url: Set(None),
        genres: Set(json!(["fantasy"])),
        episode_count: Set(None),
        air_date: Set(None),
        weekday: Set(None),
        rating: Set(0.0),
        rating_count: Set(0),
        popularity: Set(0),
        is_admin: Set(true),
        created_by: Set(None),
        is_season: Set(false),
        is_weekly: Set(false),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let result = TestDatabase::with_config(TestDbConfig::default()).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

fn scored_comment(new_id: &str, user_id: &str, score: i16) -> CommentUpsert {
    CommentUpsert {
        new_id: new_id.to_string(),
        user_id: user_id.to_string(),
        scope: CommentScope::Anime,
        target_id: "a1".to_string(),
        score: Some(score),
        content: String::new(),
    }
}

async fn seed(conn: &Arc<DatabaseConnection>) {
    let users = UserRepository::new(Arc::clone(conn));
    let animes = AnimeRepository::new(Arc::clone(conn));

    users.create(new_user("u1", "alice")).await.unwrap();
    users.create(new_user("u2", "bob")).await.unwrap();
    animes.create(new_anime("a1", "Frieren")).await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_rating_recompute_over_scored_comments() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let conn = db.connection();
    seed(&conn).await;

    let animes = AnimeRepository::new(Arc::clone(&conn));
    let comments = CommentRepository::new(Arc::clone(&conn));

    let (_, created) = comments.upsert(scored_comment("c1", "u1", 8)).await.unwrap();
    assert!(created);
    let (_, created) = comments.upsert(scored_comment("c2", "u2", 9)).await.unwrap();
    assert!(created);

    let anime = animes.get_by_id("a1").await.unwrap();
    assert!((anime.rating - 8.5).abs() < 1e-9);
    assert_eq!(anime.rating_count, 2);
    assert_eq!(anime.popularity, 2);

    // Rewriting a comment recomputes the rating without another popularity bump
    let (saved, created) = comments.upsert(scored_comment("unused", "u1", 10)).await.unwrap();
    assert!(!created);
    assert_eq!(saved.id, "c1");

    let anime = animes.get_by_id("a1").await.unwrap();
    assert!((anime.rating - 9.5).abs() < 1e-9);
    assert_eq!(anime.rating_count, 2);
    assert_eq!(anime.popularity, 2);

    let c2 = comments.get_by_id("c2").await.unwrap();
    comments.delete(c2).await.unwrap();

    let anime = animes.get_by_id("a1").await.unwrap();
    assert!((anime.rating - 10.0).abs() < 1e-9);
    assert_eq!(anime.rating_count, 1);

    db.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_likes_count_once() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let conn = db.connection();
    seed(&conn).await;

    let comments = CommentRepository::new(Arc::clone(&conn));
    comments.upsert(scored_comment("c1", "u2", 7)).await.unwrap();

    let likes = LikeRepository::new(Arc::clone(&conn));
    let like = |id: &'static str| {
        let likes = likes.clone();
        async move {
            likes
                .set_state("u1", LikeTarget::Comment, "c1", true, id.to_string())
                .await
                .unwrap()
        }
    };
    let (first, second) = tokio::join!(like("l1"), like("l2"));
    assert!(first ^ second, "exactly one call should change the like");
    assert_eq!(comments.get_by_id("c1").await.unwrap().like_count, 1);

    let unlike = || {
        let likes = likes.clone();
        async move {
            likes
                .set_state("u1", LikeTarget::Comment, "c1", false, String::new())
                .await
                .unwrap()
        }
    };
    let (first, second) = tokio::join!(unlike(), unlike());
    assert!(first ^ second);
    assert_eq!(comments.get_by_id("c1").await.unwrap().like_count, 0);

    db.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_watch_status_moves_popularity_once() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let conn = db.connection();
    seed(&conn).await;

    let animes = AnimeRepository::new(Arc::clone(&conn));
    let statuses = WatchStatusRepository::new(Arc::clone(&conn));

    let (a, b) = tokio::join!(
        statuses.set_status("u1", "a1", WatchState::Want, "w1".to_string()),
        statuses.set_status("u1", "a1", WatchState::Watching, "w2".to_string()),
    );
    assert!(a.unwrap().created ^ b.unwrap().created);
    assert_eq!(animes.get_by_id("a1").await.unwrap().popularity, 1);

    let (a, b) = tokio::join!(statuses.remove("u1", "a1"), statuses.remove("u1", "a1"));
    assert!(a.unwrap() ^ b.unwrap());
    assert_eq!(animes.get_by_id("a1").await.unwrap().popularity, 0);

    db.cleanup().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
