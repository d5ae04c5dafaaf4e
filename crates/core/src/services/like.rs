//! Like service for comments and replies.

use anitrack_common::{AppResult, IdGenerator};
use anitrack_db::{
    entities::{
        activity::{ActivityTarget, ActivityVerb},
        like::LikeTarget,
    },
    repositories::{CommentRepository, LikeRepository, ReplyRepository},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::activity::ActivityService;

/// Like or unlike request body.
#[derive(Debug, Clone, Deserialize)]
pub struct LikeInput {
    pub target_type: LikeTarget,
    pub target_id: String,
}

/// Like state after a like or unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    /// False when the call did not change anything.
    pub changed: bool,
}

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    like_repo: LikeRepository,
    comment_repo: CommentRepository,
    reply_repo: ReplyRepository,
    activity: ActivityService,
    id_gen: IdGenerator,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub const fn new(
        like_repo: LikeRepository,
        comment_repo: CommentRepository,
        reply_repo: ReplyRepository,
        activity: ActivityService,
    ) -> Self {
        Self {
            like_repo,
            comment_repo,
            reply_repo,
            activity,
            id_gen: IdGenerator::new(),
        }
    }

    async fn ensure_target(&self, target_type: LikeTarget, target_id: &str) -> AppResult<()> {
        match target_type {
            LikeTarget::Comment => self.comment_repo.get_by_id(target_id).await.map(|_| ()),
            LikeTarget::Reply => self.reply_repo.get_by_id(target_id).await.map(|_| ()),
        }
    }

    /// Like a target. Liking twice counts once.
    pub async fn like(&self, user_id: &str, input: &LikeInput) -> AppResult<LikeOutcome> {
        self.ensure_target(input.target_type, &input.target_id).await?;

        let changed = self
            .like_repo
            .set_state(
                user_id,
                input.target_type,
                &input.target_id,
                true,
                self.id_gen.generate(),
            )
            .await?;

        if changed {
            let target = match input.target_type {
                LikeTarget::Comment => ActivityTarget::Comment,
                LikeTarget::Reply => ActivityTarget::Reply,
            };
            self.activity
                .record(user_id, ActivityVerb::Liked, target, &input.target_id, json!({}))
                .await;
        }

        Ok(LikeOutcome {
            liked: true,
            changed,
        })
    }

    /// Remove a like. Unliking something not liked is a no-op.
    pub async fn unlike(&self, user_id: &str, input: &LikeInput) -> AppResult<LikeOutcome> {
        let changed = self
            .like_repo
            .set_state(
                user_id,
                input.target_type,
                &input.target_id,
                false,
                String::new(),
            )
            .await?;

        Ok(LikeOutcome {
            liked: false,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::privacy::PrivacyService;
    use anitrack_common::AppError;
    use anitrack_db::{
        entities::comment::{self, CommentScope, CommentTarget},
        repositories::{ActivityRepository, PrivacySettingRepository, UserFollowRepository},
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn mock() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn create_test_comment() -> comment::Model {
        comment::Model {
            id: "c1".to_string(),
            user_id: "u2".to_string(),
            target_type: CommentTarget::Anime,
            target_id: "a1".to_string(),
            scope: CommentScope::Anime,
            score: Some(9),
            content: String::new(),
            like_count: 3,
            reply_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(like_db: MockDatabase, comment_db: MockDatabase) -> LikeService {
        let follow_repo = UserFollowRepository::new(Arc::new(mock().into_connection()));
        let privacy = PrivacyService::new(
            PrivacySettingRepository::new(Arc::new(mock().into_connection())),
            follow_repo.clone(),
        );
        LikeService::new(
            LikeRepository::new(Arc::new(like_db.into_connection())),
            CommentRepository::new(Arc::new(comment_db.into_connection())),
            ReplyRepository::new(Arc::new(mock().into_connection())),
            ActivityService::new(
                ActivityRepository::new(Arc::new(mock().into_connection())),
                follow_repo,
                privacy,
            ),
        )
    }

    fn comment_input() -> LikeInput {
        LikeInput {
            target_type: LikeTarget::Comment,
            target_id: "c1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_like_twice_counts_once() {
        let comment_db = mock().append_query_results([[create_test_comment()], [create_test_comment()]]);
        // First call inserts and bumps the counter; second matches nothing
        let like_db = mock().append_exec_results([exec(0), exec(1), exec(1), exec(0), exec(0)]);
        let service = service(like_db, comment_db);

        let first = service.like("u1", &comment_input()).await.unwrap();
        assert!(first.liked);
        assert!(first.changed);

        let second = service.like("u1", &comment_input()).await.unwrap();
        assert!(second.liked);
        assert!(!second.changed);
    }

    #[tokio::test]
    async fn test_like_missing_comment() {
        let comment_db = mock().append_query_results([Vec::<comment::Model>::new()]);
        let service = service(mock(), comment_db);

        let result = service.like("u1", &comment_input()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unlike_without_like_is_noop() {
        let like_db = mock().append_exec_results([exec(0)]);
        let service = service(like_db, mock());

        let outcome = service.unlike("u1", &comment_input()).await.unwrap();
        assert!(!outcome.liked);
        assert!(!outcome.changed);
    }

    #[tokio::test]
    async fn test_unlike_active_like_decrements() {
        let like_db = mock().append_exec_results([exec(1), exec(1)]);
        let service = service(like_db, mock());

        let outcome = service.unlike("u1", &comment_input()).await.unwrap();
        assert!(outcome.changed);
        assert!(!outcome.liked);
    }
}
