//! Comment repository.
//!
//! Writes that touch the anime rating run inside a transaction so the
//! comment row and the derived `rating`/`rating_count` commit together.

use std::sync::Arc;

use crate::entities::{
    Anime, Comment, Like, Reply, anime,
    comment::{self, CommentScope, CommentTarget},
    like::{self, LikeTarget},
    reply,
};
use anitrack_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Expr,
};
use serde::Deserialize;

/// Comment list ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentSort {
    #[default]
    Newest,
    /// Most liked, then most replied.
    Hot,
}

/// Input for [`CommentRepository::upsert`].
#[derive(Debug, Clone)]
pub struct CommentUpsert {
    /// ID used when a new row is created.
    pub new_id: String,
    pub user_id: String,
    pub scope: CommentScope,
    pub target_id: String,
    pub score: Option<i16>,
    pub content: String,
}

/// Average of the given scores and how many there were.
#[must_use]
pub fn average_score(scores: &[i16]) -> (f64, i32) {
    if scores.is_empty() {
        return (0.0, 0);
    }
    let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
    let avg = sum as f64 / scores.len() as f64;
    // Two decimals is enough for display and keeps equality checks stable
    ((avg * 100.0).round() / 100.0, scores.len() as i32)
}

async fn anime_scores_on<C: ConnectionTrait>(conn: &C, anime_id: &str) -> Result<Vec<i16>, DbErr> {
    let scores = Comment::find()
        .select_only()
        .column(comment::Column::Score)
        .filter(comment::Column::TargetType.eq(CommentTarget::Anime))
        .filter(comment::Column::TargetId.eq(anime_id))
        .filter(comment::Column::Scope.is_in([CommentScope::Anime, CommentScope::Item]))
        .filter(comment::Column::Score.is_not_null())
        .into_tuple::<Option<i16>>()
        .all(conn)
        .await?;
    Ok(scores.into_iter().flatten().collect())
}

async fn recompute_anime_rating<C: ConnectionTrait>(conn: &C, anime_id: &str) -> Result<(), DbErr> {
    let scores = anime_scores_on(conn, anime_id).await?;
    let (rating, count) = average_score(&scores);

    Anime::update_many()
        .col_expr(anime::Column::Rating, Expr::value(rating))
        .col_expr(anime::Column::RatingCount, Expr::value(count))
        .filter(anime::Column::Id.eq(anime_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {id}")))
    }

    /// Find the comment a user wrote on a target in a scope.
    pub async fn find_by_user_target(
        &self,
        user_id: &str,
        scope: CommentScope,
        target_id: &str,
    ) -> AppResult<Option<comment::Model>> {
        Comment::find()
            .filter(comment::Column::UserId.eq(user_id))
            .filter(comment::Column::TargetType.eq(scope.target()))
            .filter(comment::Column::TargetId.eq(target_id))
            .filter(comment::Column::Scope.eq(scope))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update the caller's comment on a target.
    ///
    /// The existing row is locked (`SELECT ... FOR UPDATE`). For anime-level
    /// scopes the anime rating is recomputed, and a newly created comment
    /// bumps the anime's popularity. Returns the row and whether it was created.
    pub async fn upsert(&self, input: CommentUpsert) -> AppResult<(comment::Model, bool)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let target_type = input.scope.target();
        let existing = Comment::find()
            .filter(comment::Column::UserId.eq(input.user_id.as_str()))
            .filter(comment::Column::TargetType.eq(target_type))
            .filter(comment::Column::TargetId.eq(input.target_id.as_str()))
            .filter(comment::Column::Scope.eq(input.scope))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let now = Utc::now();
        let (saved, created) = match existing {
            Some(current) => {
                let mut active: comment::ActiveModel = current.into();
                active.score = Set(input.score);
                active.content = Set(input.content);
                active.updated_at = Set(Some(now.into()));
                let saved = active
                    .update(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                (saved, false)
            }
            None => {
                let model = comment::ActiveModel {
                    id: Set(input.new_id),
                    user_id: Set(input.user_id),
                    target_type: Set(target_type),
                    target_id: Set(input.target_id.clone()),
                    scope: Set(input.scope),
                    score: Set(input.score),
                    content: Set(input.content),
                    like_count: Set(0),
                    reply_count: Set(0),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                };
                let saved = model
                    .insert(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                (saved, true)
            }
        };

        if input.scope.rates_anime() {
            recompute_anime_rating(&txn, &input.target_id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        if created && target_type == CommentTarget::Anime {
            Anime::update_many()
                .col_expr(
                    anime::Column::Popularity,
                    Expr::col(anime::Column::Popularity).add(1),
                )
                .filter(anime::Column::Id.eq(input.target_id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((saved, created))
    }

    /// Delete a comment with its replies and likes, recomputing the rating.
    pub async fn delete(&self, comment: comment::Model) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let reply_ids: Vec<String> = Reply::find()
            .select_only()
            .column(reply::Column::Id)
            .filter(reply::Column::CommentId.eq(comment.id.as_str()))
            .into_tuple::<String>()
            .all(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !reply_ids.is_empty() {
            Like::delete_many()
                .filter(like::Column::TargetType.eq(LikeTarget::Reply))
                .filter(like::Column::TargetId.is_in(reply_ids))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Like::delete_many()
            .filter(like::Column::TargetType.eq(LikeTarget::Comment))
            .filter(like::Column::TargetId.eq(comment.id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let scope = comment.scope;
        let target_id = comment.target_id.clone();
        comment
            .delete(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if scope.rates_anime() {
            recompute_anime_rating(&txn, &target_id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments on a target, optionally restricted to one scope.
    pub async fn find_by_target(
        &self,
        target_type: CommentTarget,
        target_id: &str,
        scope: Option<CommentScope>,
        sort: CommentSort,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find()
            .filter(comment::Column::TargetType.eq(target_type))
            .filter(comment::Column::TargetId.eq(target_id));

        if let Some(scope) = scope {
            query = query.filter(comment::Column::Scope.eq(scope));
        }

        query = match sort {
            CommentSort::Newest => query.order_by_desc(comment::Column::Id),
            CommentSort::Hot => query
                .order_by_desc(comment::Column::LikeCount)
                .order_by_desc(comment::Column::ReplyCount)
                .order_by_desc(comment::Column::Id),
        };

        query
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count comments on a target.
    pub async fn count_by_target(
        &self,
        target_type: CommentTarget,
        target_id: &str,
        scope: Option<CommentScope>,
    ) -> AppResult<u64> {
        let mut query = Comment::find()
            .filter(comment::Column::TargetType.eq(target_type))
            .filter(comment::Column::TargetId.eq(target_id));

        if let Some(scope) = scope {
            query = query.filter(comment::Column::Scope.eq(scope));
        }

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Anime-level comments written by a user.
    pub async fn find_anime_comments_by_user(&self, user_id: &str) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::UserId.eq(user_id))
            .filter(comment::Column::TargetType.eq(CommentTarget::Anime))
            .filter(comment::Column::Scope.is_in([CommentScope::Anime, CommentScope::Item]))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment reply count atomically (single UPDATE query, no fetch).
    pub async fn increment_reply_count(&self, id: &str) -> AppResult<()> {
        Comment::update_many()
            .col_expr(
                comment::Column::ReplyCount,
                Expr::col(comment::Column::ReplyCount).add(1),
            )
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement reply count atomically, never below zero.
    pub async fn decrement_reply_count(&self, id: &str) -> AppResult<()> {
        Comment::update_many()
            .col_expr(
                comment::Column::ReplyCount,
                Expr::cust("GREATEST(reply_count - 1, 0)"),
            )
            .filter(comment::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
