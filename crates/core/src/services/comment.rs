//! Comment service: scores and reviews on catalog objects.

use std::collections::HashSet;

use anitrack_common::{AppError, AppResult, IdGenerator};
use anitrack_db::{
    entities::{
        activity::{ActivityTarget, ActivityVerb},
        comment::{self, CommentScope, CommentTarget},
        like::LikeTarget,
        user,
    },
    repositories::{
        AnimeRepository, CharacterRepository, CommentRepository, CommentSort, CommentUpsert,
        EpisodeRepository, LikeRepository, PersonRepository, UserProfileRepository,
        UserRepository,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::account::{UserSummary, summarize_users};
use super::activity::ActivityService;
use super::anime::AnimeKind;
use super::paging::PageParams;

/// Longest comment body, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Input for creating or replacing the caller's comment on a target.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertCommentInput {
    pub scope: CommentScope,
    pub target_id: String,
    pub score: Option<i16>,
    #[serde(default)]
    pub content: String,
}

/// Edit of an existing comment.
#[derive(Debug, Clone, Deserialize)]
pub struct EditCommentInput {
    pub score: Option<i16>,
    #[serde(default)]
    pub content: String,
}

/// Comment list query.
#[derive(Debug, Clone, Deserialize)]
pub struct ListCommentsQuery {
    pub target_type: CommentTarget,
    pub target_id: String,
    pub scope: Option<CommentScope>,
    #[serde(default)]
    pub sort: CommentSort,
}

/// Comment with its author and the viewer's like state.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: comment::Model,
    pub user: Option<UserSummary>,
    pub liked: bool,
}

/// One page of comments.
#[derive(Debug, Clone, Serialize)]
pub struct CommentPage {
    pub items: Vec<CommentView>,
    pub total: u64,
}

/// Check score range and content length. Content may be blank only when a
/// score is given.
pub fn validate_comment(score: Option<i16>, content: &str) -> AppResult<()> {
    if let Some(score) = score {
        if !(1..=10).contains(&score) {
            return Err(AppError::Validation(
                "Score must be between 1 and 10".to_string(),
            ));
        }
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation(format!(
            "Content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    if score.is_none() && content.trim().is_empty() {
        return Err(AppError::Validation(
            "Content is required when no score is given".to_string(),
        ));
    }
    Ok(())
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    anime_repo: AnimeRepository,
    episode_repo: EpisodeRepository,
    character_repo: CharacterRepository,
    person_repo: PersonRepository,
    like_repo: LikeRepository,
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    activity: ActivityService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        comment_repo: CommentRepository,
        anime_repo: AnimeRepository,
        episode_repo: EpisodeRepository,
        character_repo: CharacterRepository,
        person_repo: PersonRepository,
        like_repo: LikeRepository,
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
        activity: ActivityService,
    ) -> Self {
        Self {
            comment_repo,
            anime_repo,
            episode_repo,
            character_repo,
            person_repo,
            like_repo,
            user_repo,
            profile_repo,
            activity,
            id_gen: IdGenerator::new(),
        }
    }

    /// Ensure the target exists and fits the scope. Returns a display title.
    async fn check_target(&self, scope: CommentScope, target_id: &str) -> AppResult<String> {
        match scope {
            CommentScope::Anime | CommentScope::Item => {
                let anime = self.anime_repo.get_by_id(target_id).await?;
                if AnimeKind::of(&anime).comment_scope() != scope {
                    return Err(AppError::BadRequest(format!(
                        "Scope {scope:?} does not match this entry"
                    )));
                }
                Ok(anime.title)
            }
            CommentScope::Episode => self
                .episode_repo
                .find_by_id(target_id)
                .await?
                .map(|e| format!("Episode {}", e.number))
                .ok_or_else(|| AppError::NotFound(format!("Episode {target_id}"))),
            CommentScope::Character => self
                .character_repo
                .find_by_id(target_id)
                .await?
                .map(|c| c.name)
                .ok_or_else(|| AppError::NotFound(format!("Character {target_id}"))),
            CommentScope::Person => self
                .person_repo
                .find_by_id(target_id)
                .await?
                .map(|p| p.name)
                .ok_or_else(|| AppError::NotFound(format!("Person {target_id}"))),
        }
    }

    /// Create or replace the caller's comment. Returns the comment and
    /// whether it was newly created.
    pub async fn upsert(
        &self,
        user_id: &str,
        input: UpsertCommentInput,
    ) -> AppResult<(comment::Model, bool)> {
        validate_comment(input.score, &input.content)?;
        let title = self.check_target(input.scope, &input.target_id).await?;

        let (saved, created) = self
            .comment_repo
            .upsert(CommentUpsert {
                new_id: self.id_gen.generate(),
                user_id: user_id.to_string(),
                scope: input.scope,
                target_id: input.target_id,
                score: input.score,
                content: input.content.trim().to_string(),
            })
            .await?;

        let verb = if saved.score.is_some() {
            ActivityVerb::Rated
        } else {
            ActivityVerb::Commented
        };
        self.activity
            .record(
                user_id,
                verb,
                ActivityTarget::Comment,
                &saved.id,
                json!({
                    "title": title,
                    "scope": saved.scope,
                    "target_id": saved.target_id,
                    "score": saved.score,
                }),
            )
            .await;

        tracing::debug!(comment_id = %saved.id, created, "Saved comment");
        Ok((saved, created))
    }

    /// Edit the caller's own comment by ID.
    pub async fn edit(
        &self,
        user_id: &str,
        id: &str,
        input: EditCommentInput,
    ) -> AppResult<comment::Model> {
        let existing = self.comment_repo.get_by_id(id).await?;
        if existing.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }

        let (saved, _) = self
            .upsert(
                user_id,
                UpsertCommentInput {
                    scope: existing.scope,
                    target_id: existing.target_id,
                    score: input.score,
                    content: input.content,
                },
            )
            .await?;
        Ok(saved)
    }

    /// Delete a comment (owner or admin).
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        if comment.user_id != actor.id && !actor.is_admin {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.comment_repo.delete(comment).await?;
        tracing::info!(comment_id = %id, actor_id = %actor.id, "Deleted comment");
        Ok(())
    }

    /// Get one comment.
    pub async fn get(&self, id: &str) -> AppResult<comment::Model> {
        self.comment_repo.get_by_id(id).await
    }

    /// Comments on a target with authors and like flags.
    pub async fn list(
        &self,
        viewer_id: Option<&str>,
        query: ListCommentsQuery,
        page: PageParams,
    ) -> AppResult<CommentPage> {
        if let Some(scope) = query.scope {
            if scope.target() != query.target_type {
                return Err(AppError::BadRequest(
                    "Scope does not belong to the target type".to_string(),
                ));
            }
        }

        let comments = self
            .comment_repo
            .find_by_target(
                query.target_type,
                &query.target_id,
                query.scope,
                query.sort,
                page.limit(),
                page.offset(),
            )
            .await?;
        let total = self
            .comment_repo
            .count_by_target(query.target_type, &query.target_id, query.scope)
            .await?;

        let liked: HashSet<String> = match viewer_id {
            Some(viewer) => {
                let ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
                self.like_repo
                    .find_active_by_targets(viewer, LikeTarget::Comment, &ids)
                    .await?
                    .into_iter()
                    .map(|l| l.target_id)
                    .collect()
            }
            None => HashSet::new(),
        };

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors = summarize_users(&self.user_repo, &self.profile_repo, &author_ids).await?;

        let items = comments
            .into_iter()
            .map(|comment| CommentView {
                user: authors.iter().find(|u| u.id == comment.user_id).cloned(),
                liked: liked.contains(&comment.id),
                comment,
            })
            .collect();

        Ok(CommentPage { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::privacy::PrivacyService;
    use anitrack_db::{
        entities::anime,
        repositories::{ActivityRepository, PrivacySettingRepository, UserFollowRepository},
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn mock() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn create_test_comment(id: &str, user_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            target_type: CommentTarget::Anime,
            target_id: "a1".to_string(),
            scope: CommentScope::Anime,
            score: Some(8),
            content: "Great".to_string(),
            like_count: 0,
            reply_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_user(id: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_string(),
            email: None,
            password_hash: None,
            is_admin,
            is_active: true,
            is_banned: false,
            ban_reason: None,
            banned_until: None,
            last_login_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_item(id: &str) -> anime::Model {
        anime::Model {
            id: id.to_string(),
            external_id: None,
            title: "Fan item".to_string(),
            title_original: None,
            synopsis: None,
            cover_url: None,
            genres: serde_json::json!([]),
            episode_count: None,
            air_date: None,
            weekday: None,
            rating: 0.0,
            rating_count: 0,
            popularity: 0,
            is_admin: false,
            created_by: Some("u1".to_string()),
            is_season: false,
            is_weekly: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(comment_db: MockDatabase, anime_db: MockDatabase) -> CommentService {
        let follow_repo = UserFollowRepository::new(Arc::new(mock().into_connection()));
        let privacy = PrivacyService::new(
            PrivacySettingRepository::new(Arc::new(mock().into_connection())),
            follow_repo.clone(),
        );
        CommentService::new(
            CommentRepository::new(Arc::new(comment_db.into_connection())),
            AnimeRepository::new(Arc::new(anime_db.into_connection())),
            EpisodeRepository::new(Arc::new(mock().into_connection())),
            CharacterRepository::new(Arc::new(mock().into_connection())),
            PersonRepository::new(Arc::new(mock().into_connection())),
            LikeRepository::new(Arc::new(mock().into_connection())),
            UserRepository::new(Arc::new(mock().into_connection())),
            UserProfileRepository::new(Arc::new(mock().into_connection())),
            ActivityService::new(
                ActivityRepository::new(Arc::new(mock().into_connection())),
                follow_repo,
                privacy,
            ),
        )
    }

    #[test]
    fn test_validate_comment() {
        assert!(validate_comment(Some(10), "").is_ok());
        assert!(validate_comment(None, "Nice").is_ok());
        assert!(validate_comment(Some(0), "x").is_err());
        assert!(validate_comment(Some(11), "x").is_err());
        assert!(validate_comment(None, "   ").is_err());
        assert!(validate_comment(Some(5), &"a".repeat(MAX_CONTENT_CHARS)).is_ok());
        assert!(validate_comment(Some(5), &"a".repeat(MAX_CONTENT_CHARS + 1)).is_err());
    }

    #[tokio::test]
    async fn test_upsert_rejects_scope_mismatch() {
        let anime_db = mock().append_query_results([[create_test_item("i1")]]);
        let service = service(mock(), anime_db);

        let result = service
            .upsert(
                "u2",
                UpsertCommentInput {
                    scope: CommentScope::Anime,
                    target_id: "i1".to_string(),
                    score: Some(7),
                    content: String::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_upsert_missing_anime() {
        let anime_db = mock().append_query_results([Vec::<anime::Model>::new()]);
        let service = service(mock(), anime_db);

        let result = service
            .upsert(
                "u1",
                UpsertCommentInput {
                    scope: CommentScope::Anime,
                    target_id: "missing".to_string(),
                    score: Some(7),
                    content: String::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::AnimeNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_by_stranger_is_forbidden() {
        let comment_db = mock().append_query_results([[create_test_comment("c1", "u1")]]);
        let service = service(comment_db, mock());

        let result = service.delete(&create_test_user("u2", false), "c1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_edit_by_stranger_is_forbidden() {
        let comment_db = mock().append_query_results([[create_test_comment("c1", "u1")]]);
        let service = service(comment_db, mock());

        let result = service
            .edit(
                "u2",
                "c1",
                EditCommentInput {
                    score: Some(1),
                    content: String::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_rejects_foreign_scope() {
        let service = service(mock(), mock());
        let result = service
            .list(
                None,
                ListCommentsQuery {
                    target_type: CommentTarget::Episode,
                    target_id: "e1".to_string(),
                    scope: Some(CommentScope::Anime),
                    sort: CommentSort::Newest,
                },
                PageParams::default(),
            )
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
