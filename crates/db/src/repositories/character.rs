//! Character repository.

use std::sync::Arc;

use crate::entities::{Character, character};
use crate::repositories::user::escape_like;
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
    sea_query::{Expr, Func},
};

/// Character repository for database operations.
#[derive(Clone)]
pub struct CharacterRepository {
    db: Arc<DatabaseConnection>,
}

impl CharacterRepository {
    /// Create a new character repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a character by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<character::Model>> {
        Character::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new character.
    pub async fn create(&self, model: character::ActiveModel) -> AppResult<character::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Characters of an anime.
    pub async fn find_by_anime(&self, anime_id: &str) -> AppResult<Vec<character::Model>> {
        Character::find()
            .filter(character::Column::AnimeId.eq(anime_id))
            .order_by_asc(character::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Case-insensitive name search.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<character::Model>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        Character::find()
            .filter(Expr::expr(Func::lower(Expr::col(character::Column::Name))).like(&pattern))
            .order_by_asc(character::Column::Name)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
