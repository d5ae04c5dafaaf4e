//! Reply service.

use std::collections::HashSet;

use anitrack_common::{AppError, AppResult, IdGenerator};
use anitrack_db::{
    entities::{
        activity::{ActivityTarget, ActivityVerb},
        like::LikeTarget,
        reply, user,
    },
    repositories::{
        CommentRepository, LikeRepository, ReplyRepository, UserProfileRepository, UserRepository,
    },
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::account::{UserSummary, summarize_users};
use super::activity::ActivityService;
use super::comment::MAX_CONTENT_CHARS;
use super::paging::PageParams;

/// Input for replying to a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReplyInput {
    pub content: String,
    /// User being answered inside the thread.
    pub reply_to_user_id: Option<String>,
}

/// Reply with its author and the viewer's like state.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyView {
    #[serde(flatten)]
    pub reply: reply::Model,
    pub user: Option<UserSummary>,
    pub liked: bool,
}

/// One page of replies.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyPage {
    pub items: Vec<ReplyView>,
    pub total: u64,
}

/// Reply service for business logic.
#[derive(Clone)]
pub struct ReplyService {
    reply_repo: ReplyRepository,
    comment_repo: CommentRepository,
    like_repo: LikeRepository,
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    activity: ActivityService,
    id_gen: IdGenerator,
}

impl ReplyService {
    /// Create a new reply service.
    #[must_use]
    pub const fn new(
        reply_repo: ReplyRepository,
        comment_repo: CommentRepository,
        like_repo: LikeRepository,
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
        activity: ActivityService,
    ) -> Self {
        Self {
            reply_repo,
            comment_repo,
            like_repo,
            user_repo,
            profile_repo,
            activity,
            id_gen: IdGenerator::new(),
        }
    }

    /// Reply to a comment.
    pub async fn create(
        &self,
        user_id: &str,
        comment_id: &str,
        input: CreateReplyInput,
    ) -> AppResult<reply::Model> {
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::Validation("Reply cannot be empty".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(AppError::Validation(format!(
                "Reply must be at most {MAX_CONTENT_CHARS} characters"
            )));
        }

        self.comment_repo.get_by_id(comment_id).await?;

        if let Some(reply_to) = &input.reply_to_user_id {
            self.user_repo.get_by_id(reply_to).await?;
        }

        let model = reply::ActiveModel {
            id: Set(self.id_gen.generate()),
            comment_id: Set(comment_id.to_string()),
            user_id: Set(user_id.to_string()),
            reply_to_user_id: Set(input.reply_to_user_id),
            content: Set(content),
            like_count: Set(0),
            created_at: Set(Utc::now().into()),
        };
        let saved = self.reply_repo.create(model).await?;

        let excerpt: String = saved.content.chars().take(80).collect();
        self.activity
            .record(
                user_id,
                ActivityVerb::Replied,
                ActivityTarget::Reply,
                &saved.id,
                json!({ "comment_id": comment_id, "excerpt": excerpt }),
            )
            .await;

        Ok(saved)
    }

    /// Delete a reply (owner or admin).
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let reply = self.reply_repo.get_by_id(id).await?;
        if reply.user_id != actor.id && !actor.is_admin {
            return Err(AppError::Forbidden(
                "You can only delete your own replies".to_string(),
            ));
        }

        self.reply_repo.delete(reply).await
    }

    /// Replies to a comment, oldest first.
    pub async fn list(
        &self,
        viewer_id: Option<&str>,
        comment_id: &str,
        page: PageParams,
    ) -> AppResult<ReplyPage> {
        self.comment_repo.get_by_id(comment_id).await?;

        let replies = self
            .reply_repo
            .find_by_comment(comment_id, page.limit(), page.offset())
            .await?;
        let total = self.reply_repo.count_by_comment(comment_id).await?;

        let liked: HashSet<String> = match viewer_id {
            Some(viewer) => {
                let ids: Vec<String> = replies.iter().map(|r| r.id.clone()).collect();
                self.like_repo
                    .find_active_by_targets(viewer, LikeTarget::Reply, &ids)
                    .await?
                    .into_iter()
                    .map(|l| l.target_id)
                    .collect()
            }
            None => HashSet::new(),
        };

        let mut author_ids: Vec<String> = replies.iter().map(|r| r.user_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors = summarize_users(&self.user_repo, &self.profile_repo, &author_ids).await?;

        let items = replies
            .into_iter()
            .map(|reply| ReplyView {
                user: authors.iter().find(|u| u.id == reply.user_id).cloned(),
                liked: liked.contains(&reply.id),
                reply,
            })
            .collect();

        Ok(ReplyPage { items, total })
    }
}
