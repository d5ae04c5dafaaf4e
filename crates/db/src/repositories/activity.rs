//! Activity repository.

use std::sync::Arc;

use crate::entities::{Activity, activity};
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Activity repository for database operations.
#[derive(Clone)]
pub struct ActivityRepository {
    db: Arc<DatabaseConnection>,
}

impl ActivityRepository {
    /// Create a new activity repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an activity.
    pub async fn create(&self, model: activity::ActiveModel) -> AppResult<activity::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Activities of one user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<activity::Model>> {
        Activity::find()
            .filter(activity::Column::UserId.eq(user_id))
            .order_by_desc(activity::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Activities of several users merged, newest first.
    pub async fn find_by_users(
        &self,
        user_ids: &[String],
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<activity::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        Activity::find()
            .filter(activity::Column::UserId.is_in(user_ids.to_vec()))
            .order_by_desc(activity::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
