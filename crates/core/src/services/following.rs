//! Following service.

use anitrack_common::{AppError, AppResult, IdGenerator};
use anitrack_db::{
    entities::{
        activity::{ActivityTarget, ActivityVerb},
        user_follow,
    },
    repositories::{UserFollowRepository, UserProfileRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;
use serde_json::json;

use super::account::{UserSummary, summarize_users};
use super::activity::ActivityService;
use super::paging::PageParams;
use super::privacy::{PrivacyFacet, PrivacyService};

/// Result of a follow request.
#[derive(Debug, Clone, Serialize)]
pub struct FollowResult {
    pub edge: user_follow::Model,
    /// False when the edge already existed.
    pub created: bool,
}

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    follow_repo: UserFollowRepository,
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    privacy: PrivacyService,
    activity: ActivityService,
    id_gen: IdGenerator,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(
        follow_repo: UserFollowRepository,
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
        privacy: PrivacyService,
        activity: ActivityService,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            profile_repo,
            privacy,
            activity,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow a user. Following someone already followed is a no-op.
    pub async fn follow(&self, follower_id: &str, following_id: &str) -> AppResult<FollowResult> {
        // Can't follow yourself
        if follower_id == following_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        let target = self.user_repo.get_by_id(following_id).await?;
        if !target.is_active {
            return Err(AppError::UserNotFound(following_id.to_string()));
        }

        if let Some(edge) = self.follow_repo.find_by_pair(follower_id, following_id).await? {
            return Ok(FollowResult {
                edge,
                created: false,
            });
        }

        let model = user_follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            following_id: Set(following_id.to_string()),
            created_at: Set(Utc::now().into()),
        };
        let edge = self.follow_repo.create(model).await?;

        self.activity
            .record(
                follower_id,
                ActivityVerb::Followed,
                ActivityTarget::User,
                following_id,
                json!({ "username": target.username }),
            )
            .await;

        Ok(FollowResult {
            edge,
            created: true,
        })
    }

    /// Unfollow a user. Unfollowing someone not followed is a no-op.
    pub async fn unfollow(&self, follower_id: &str, following_id: &str) -> AppResult<bool> {
        self.user_repo.get_by_id(following_id).await?;
        self.follow_repo
            .delete_by_pair(follower_id, following_id)
            .await
    }

    /// Whether `owner_id` follows `viewer_id`.
    pub async fn is_friend(&self, owner_id: &str, viewer_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(owner_id, viewer_id).await
    }

    /// Whether the two users follow each other.
    pub async fn is_mutual(&self, a: &str, b: &str) -> AppResult<bool> {
        Ok(self.follow_repo.is_following(a, b).await?
            && self.follow_repo.is_following(b, a).await?)
    }

    /// Users followed by `owner_id`, subject to the followings facet.
    pub async fn followings(
        &self,
        viewer_id: Option<&str>,
        owner_id: &str,
        page: PageParams,
    ) -> AppResult<Vec<UserSummary>> {
        self.user_repo.get_by_id(owner_id).await?;
        self.privacy
            .ensure_can_view(owner_id, viewer_id, PrivacyFacet::Followings)
            .await?;

        let ids: Vec<String> = self
            .follow_repo
            .find_followings(owner_id, page.limit(), page.offset())
            .await?
            .into_iter()
            .map(|edge| edge.following_id)
            .collect();

        summarize_users(&self.user_repo, &self.profile_repo, &ids).await
    }

    /// Users following `owner_id`, subject to the followers facet.
    pub async fn followers(
        &self,
        viewer_id: Option<&str>,
        owner_id: &str,
        page: PageParams,
    ) -> AppResult<Vec<UserSummary>> {
        self.user_repo.get_by_id(owner_id).await?;
        self.privacy
            .ensure_can_view(owner_id, viewer_id, PrivacyFacet::Followers)
            .await?;

        let ids: Vec<String> = self
            .follow_repo
            .find_followers(owner_id, page.limit(), page.offset())
            .await?
            .into_iter()
            .map(|edge| edge.follower_id)
            .collect();

        summarize_users(&self.user_repo, &self.profile_repo, &ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anitrack_db::{
        entities::{activity, user},
        repositories::{ActivityRepository, PrivacySettingRepository},
    };
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: None,
            password_hash: None,
            is_admin: false,
            is_active: true,
            is_banned: false,
            ban_reason: None,
            banned_until: None,
            last_login_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_edge(id: &str, follower_id: &str, following_id: &str) -> user_follow::Model {
        user_follow::Model {
            id: id.to_string(),
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service(user_db: MockDatabase, follow_db: MockDatabase, activity_db: MockDatabase) -> FollowingService {
        let follow_conn = Arc::new(follow_db.into_connection());
        let follow_repo = UserFollowRepository::new(follow_conn);
        let privacy = PrivacyService::new(
            PrivacySettingRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            follow_repo.clone(),
        );
        let activity = ActivityService::new(
            ActivityRepository::new(Arc::new(activity_db.into_connection())),
            follow_repo.clone(),
            privacy.clone(),
        );

        FollowingService::new(
            follow_repo,
            UserRepository::new(Arc::new(user_db.into_connection())),
            UserProfileRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            privacy,
            activity,
        )
    }

    #[tokio::test]
    async fn test_follow_yourself_returns_error() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service.follow("u1", "u1").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_follow_missing_user() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]);
        let service = service(
            user_db,
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service.follow("u1", "ghost").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_again_is_idempotent() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2", "bob")]]);
        let follow_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_edge("f1", "u1", "u2")]]);
        let service = service(user_db, follow_db, MockDatabase::new(DatabaseBackend::Postgres));

        let result = service.follow("u1", "u2").await.unwrap();
        assert!(!result.created);
        assert_eq!(result.edge.id, "f1");
    }

    #[tokio::test]
    async fn test_follow_creates_edge_and_activity() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2", "bob")]]);
        let follow_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user_follow::Model>::new()])
            .append_query_results([[create_test_edge("f1", "u1", "u2")]]);
        let activity_db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
            activity::Model {
                id: "act1".to_string(),
                user_id: "u1".to_string(),
                verb: ActivityVerb::Followed,
                target_type: ActivityTarget::User,
                target_id: "u2".to_string(),
                summary: json!({"username": "bob"}),
                created_at: Utc::now().into(),
            },
        ]]);
        let service = service(user_db, follow_db, activity_db);

        let result = service.follow("u1", "u2").await.unwrap();
        assert!(result.created);
        assert_eq!(result.edge.following_id, "u2");
    }

    #[tokio::test]
    async fn test_is_mutual_requires_both_edges() {
        let follow_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_edge("f1", "u1", "u2")]])
            .append_query_results([Vec::<user_follow::Model>::new()]);
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            follow_db,
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(!service.is_mutual("u1", "u2").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_friend_is_directional() {
        let follow_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user_follow::Model>::new()]);
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            follow_db,
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(!service.is_friend("owner", "viewer").await.unwrap());
    }
}
