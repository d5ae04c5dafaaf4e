//! Episode repository.

use std::sync::Arc;

use crate::entities::{Episode, episode};
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Episode repository for database operations.
#[derive(Clone)]
pub struct EpisodeRepository {
    db: Arc<DatabaseConnection>,
}

impl EpisodeRepository {
    /// Create a new episode repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an episode by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<episode::Model>> {
        Episode::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an episode by anime and number.
    pub async fn find_by_number(
        &self,
        anime_id: &str,
        number: i32,
    ) -> AppResult<Option<episode::Model>> {
        Episode::find()
            .filter(episode::Column::AnimeId.eq(anime_id))
            .filter(episode::Column::Number.eq(number))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new episode.
    pub async fn create(&self, model: episode::ActiveModel) -> AppResult<episode::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All episodes of an anime in broadcast order.
    pub async fn find_by_anime(&self, anime_id: &str) -> AppResult<Vec<episode::Model>> {
        Episode::find()
            .filter(episode::Column::AnimeId.eq(anime_id))
            .order_by_asc(episode::Column::Number)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
