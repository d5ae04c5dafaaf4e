//! Activity log: append-only records of what users did.

use anitrack_common::{AppResult, IdGenerator};
use anitrack_db::{
    entities::activity::{self, ActivityTarget, ActivityVerb},
    repositories::{ActivityRepository, UserFollowRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde_json::Value;

use super::paging::PageParams;
use super::privacy::{PrivacyFacet, PrivacyService};

/// Service for writing and reading activities.
#[derive(Clone)]
pub struct ActivityService {
    activity_repo: ActivityRepository,
    follow_repo: UserFollowRepository,
    privacy: PrivacyService,
    id_gen: IdGenerator,
}

impl ActivityService {
    /// Create a new activity service.
    #[must_use]
    pub const fn new(
        activity_repo: ActivityRepository,
        follow_repo: UserFollowRepository,
        privacy: PrivacyService,
    ) -> Self {
        Self {
            activity_repo,
            follow_repo,
            privacy,
            id_gen: IdGenerator::new(),
        }
    }

    /// Append an activity. Failures are logged and swallowed so the action
    /// that triggered the record still succeeds.
    pub async fn record(
        &self,
        user_id: &str,
        verb: ActivityVerb,
        target_type: ActivityTarget,
        target_id: &str,
        summary: Value,
    ) {
        let model = activity::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            verb: Set(verb),
            target_type: Set(target_type),
            target_id: Set(target_id.to_string()),
            summary: Set(summary),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = self.activity_repo.create(model).await {
            tracing::warn!(error = %e, user_id = %user_id, verb = ?verb, "Failed to record activity");
        }
    }

    /// Activities of `owner_id`, subject to the owner's activities facet.
    pub async fn user_activities(
        &self,
        viewer_id: Option<&str>,
        owner_id: &str,
        page: PageParams,
    ) -> AppResult<Vec<activity::Model>> {
        self.privacy
            .ensure_can_view(owner_id, viewer_id, PrivacyFacet::Activities)
            .await?;

        self.activity_repo
            .find_by_user(owner_id, page.limit(), page.offset())
            .await
    }

    /// Activities of everyone the user follows, newest first.
    pub async fn feed(&self, user_id: &str, page: PageParams) -> AppResult<Vec<activity::Model>> {
        let following = self.follow_repo.following_ids(user_id).await?;
        self.activity_repo
            .find_by_users(&following, page.limit(), page.offset())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anitrack_common::AppError;
    use anitrack_db::{entities::privacy_setting, repositories::PrivacySettingRepository};
    use privacy_setting::Visibility;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use serde_json::json;
    use std::sync::Arc;

    fn create_test_activity(id: &str, user_id: &str) -> activity::Model {
        activity::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            verb: ActivityVerb::Commented,
            target_type: ActivityTarget::Anime,
            target_id: "a1".to_string(),
            summary: json!({"title": "Frieren"}),
            created_at: Utc::now().into(),
        }
    }

    fn service(activity_db: MockDatabase, follow_db: MockDatabase, privacy_db: MockDatabase) -> ActivityService {
        let follow_conn = Arc::new(follow_db.into_connection());
        ActivityService::new(
            ActivityRepository::new(Arc::new(activity_db.into_connection())),
            UserFollowRepository::new(follow_conn.clone()),
            PrivacyService::new(
                PrivacySettingRepository::new(Arc::new(privacy_db.into_connection())),
                UserFollowRepository::new(follow_conn),
            ),
        )
    }

    #[tokio::test]
    async fn test_record_swallows_errors() {
        let activity_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("boom".to_string())]);
        let service = service(
            activity_db,
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        service
            .record("u1", ActivityVerb::Followed, ActivityTarget::User, "u2", json!({}))
            .await;
    }

    #[tokio::test]
    async fn test_feed_without_followings_is_empty() {
        let follow_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()]);
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            follow_db,
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let feed = service.feed("u1", PageParams::default()).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_user_activities_hidden_when_private() {
        let settings = privacy_setting::Model {
            user_id: "owner".to_string(),
            followings: Visibility::Public,
            followers: Visibility::Public,
            watchlist: Visibility::Public,
            activities: Visibility::OnlySelf,
            updated_at: Utc::now().into(),
        };
        let privacy_db =
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[settings]]);
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            privacy_db,
        );

        let result = service
            .user_activities(Some("viewer"), "owner", PageParams::default())
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_own_activities_are_visible() {
        let activity_db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
            create_test_activity("act2", "owner"),
            create_test_activity("act1", "owner"),
        ]]);
        let service = service(
            activity_db,
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let activities = service
            .user_activities(Some("owner"), "owner", PageParams::default())
            .await
            .unwrap();
        assert_eq!(activities.len(), 2);
    }
}
