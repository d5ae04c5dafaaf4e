//! User follow repository.

use std::sync::Arc;

use crate::entities::{UserFollow, user_follow};
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// User follow repository for database operations.
#[derive(Clone)]
pub struct UserFollowRepository {
    db: Arc<DatabaseConnection>,
}

impl UserFollowRepository {
    /// Create a new user follow repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a follow edge by follower and followed user.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> AppResult<Option<user_follow::Model>> {
        UserFollow::find()
            .filter(user_follow::Column::FollowerId.eq(follower_id))
            .filter(user_follow::Column::FollowingId.eq(following_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user is following another user.
    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, following_id).await?.is_some())
    }

    /// Create a new follow edge.
    pub async fn create(&self, model: user_follow::ActiveModel) -> AppResult<user_follow::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a follow edge. Returns whether an edge existed.
    pub async fn delete_by_pair(&self, follower_id: &str, following_id: &str) -> AppResult<bool> {
        let Some(edge) = self.find_by_pair(follower_id, following_id).await? else {
            return Ok(false);
        };
        edge.delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Edges where `user_id` is the follower (paginated, newest first).
    pub async fn find_followings(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user_follow::Model>> {
        UserFollow::find()
            .filter(user_follow::Column::FollowerId.eq(user_id))
            .order_by_desc(user_follow::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Edges where `user_id` is followed (paginated, newest first).
    pub async fn find_followers(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user_follow::Model>> {
        UserFollow::find()
            .filter(user_follow::Column::FollowingId.eq(user_id))
            .order_by_desc(user_follow::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of every user `user_id` follows.
    pub async fn following_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        UserFollow::find()
            .select_only()
            .column(user_follow::Column::FollowingId)
            .filter(user_follow::Column::FollowerId.eq(user_id))
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count followers of a user.
    pub async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        UserFollow::find()
            .filter(user_follow::Column::FollowingId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count users a user follows.
    pub async fn count_followings(&self, user_id: &str) -> AppResult<u64> {
        UserFollow::find()
            .filter(user_follow::Column::FollowerId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_follow(id: &str, follower_id: &str, following_id: &str) -> user_follow::Model {
        user_follow::Model {
            id: id.to_string(),
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_is_following_true() {
        let edge = create_test_follow("f1", "user1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge]])
                .into_connection(),
        );

        let repo = UserFollowRepository::new(db);
        assert!(repo.is_following("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_following_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user_follow::Model>::new()])
                .into_connection(),
        );

        let repo = UserFollowRepository::new(db);
        assert!(!repo.is_following("user1", "user3").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_pair_missing_edge() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user_follow::Model>::new()])
                .into_connection(),
        );

        let repo = UserFollowRepository::new(db);
        assert!(!repo.delete_by_pair("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_followers() {
        let f1 = create_test_follow("f1", "user2", "user1");
        let f2 = create_test_follow("f2", "user3", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f1, f2]])
                .into_connection(),
        );

        let repo = UserFollowRepository::new(db);
        let result = repo.find_followers("user1", 10, 0).await.unwrap();

        assert_eq!(result.len(), 2);
    }
}
