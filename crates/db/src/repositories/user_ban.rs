//! User ban repository.

use std::sync::Arc;

use crate::entities::{UserBan, user_ban};
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Repository for ban history.
#[derive(Clone)]
pub struct UserBanRepository {
    db: Arc<DatabaseConnection>,
}

impl UserBanRepository {
    /// Create a new user ban repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a ban.
    pub async fn create(&self, model: user_ban::ActiveModel) -> AppResult<user_ban::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the ban of a user that has not been lifted yet.
    pub async fn find_open_by_user(&self, user_id: &str) -> AppResult<Option<user_ban::Model>> {
        UserBan::find()
            .filter(user_ban::Column::UserId.eq(user_id))
            .filter(user_ban::Column::LiftedAt.is_null())
            .order_by_desc(user_ban::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark every open ban of a user as lifted.
    pub async fn lift_all(&self, user_id: &str, lifted_by: Option<&str>) -> AppResult<()> {
        UserBan::update_many()
            .set(user_ban::ActiveModel {
                lifted_at: Set(Some(chrono::Utc::now().into())),
                lifted_by: Set(lifted_by.map(str::to_string)),
                ..Default::default()
            })
            .filter(user_ban::Column::UserId.eq(user_id))
            .filter(user_ban::Column::LiftedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Ban history of a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user_ban::Model>> {
        UserBan::find()
            .filter(user_ban::Column::UserId.eq(user_id))
            .order_by_desc(user_ban::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_open_by_user() {
        let ban = user_ban::Model {
            id: "b1".to_string(),
            user_id: "u1".to_string(),
            admin_id: "admin".to_string(),
            reason: "spam".to_string(),
            created_at: Utc::now().into(),
            expires_at: None,
            lifted_at: None,
            lifted_by: None,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[ban]])
                .into_connection(),
        );

        let repo = UserBanRepository::new(db);
        let found = repo.find_open_by_user("u1").await.unwrap().unwrap();

        assert_eq!(found.reason, "spam");
        assert!(found.expires_at.is_none());
    }
}
