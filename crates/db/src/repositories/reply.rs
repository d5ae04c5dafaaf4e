//! Reply repository.

use std::sync::Arc;

use crate::entities::{Comment, Like, Reply, comment, like, reply};
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};

/// Reply repository for database operations.
#[derive(Clone)]
pub struct ReplyRepository {
    db: Arc<DatabaseConnection>,
}

impl ReplyRepository {
    /// Create a new reply repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a reply by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<reply::Model>> {
        Reply::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a reply by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<reply::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reply {id}")))
    }

    /// Insert a reply and bump the parent comment's reply count.
    pub async fn create(&self, model: reply::ActiveModel) -> AppResult<reply::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let saved = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Comment::update_many()
            .col_expr(
                comment::Column::ReplyCount,
                Expr::col(comment::Column::ReplyCount).add(1),
            )
            .filter(comment::Column::Id.eq(saved.comment_id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(saved)
    }

    /// Delete a reply with its likes and decrement the parent's reply count.
    pub async fn delete(&self, reply: reply::Model) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Like::delete_many()
            .filter(like::Column::TargetType.eq(like::LikeTarget::Reply))
            .filter(like::Column::TargetId.eq(reply.id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let comment_id = reply.comment_id.clone();
        reply
            .delete(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Comment::update_many()
            .col_expr(
                comment::Column::ReplyCount,
                Expr::cust("GREATEST(reply_count - 1, 0)"),
            )
            .filter(comment::Column::Id.eq(comment_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replies to a comment, oldest first.
    pub async fn find_by_comment(
        &self,
        comment_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<reply::Model>> {
        Reply::find()
            .filter(reply::Column::CommentId.eq(comment_id))
            .order_by_asc(reply::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count replies to a comment.
    pub async fn count_by_comment(&self, comment_id: &str) -> AppResult<u64> {
        Reply::find()
            .filter(reply::Column::CommentId.eq(comment_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
