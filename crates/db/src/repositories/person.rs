//! Person repository.

use std::sync::Arc;

use crate::entities::{Person, person};
use crate::repositories::user::escape_like;
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, Func},
};

/// Person repository for database operations.
#[derive(Clone)]
pub struct PersonRepository {
    db: Arc<DatabaseConnection>,
}

impl PersonRepository {
    /// Create a new person repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a person by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<person::Model>> {
        Person::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new person.
    pub async fn create(&self, model: person::ActiveModel) -> AppResult<person::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List people by name.
    pub async fn list(&self, limit: u64, offset: u64) -> AppResult<Vec<person::Model>> {
        Person::find()
            .order_by_asc(person::Column::Name)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Case-insensitive name search.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<person::Model>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        Person::find()
            .filter(Expr::expr(Func::lower(Expr::col(person::Column::Name))).like(&pattern))
            .order_by_asc(person::Column::Name)
            .limit(limit)
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
    async fn test_search() {
        let person = person::Model {
            id: "p1".to_string(),
            name: "Hayao Miyazaki".to_string(),
            description: None,
            image_url: None,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[person]])
                .into_connection(),
        );

        let repo = PersonRepository::new(db);
        let result = repo.search("miyazaki", 10).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Hayao Miyazaki");
    }
}
