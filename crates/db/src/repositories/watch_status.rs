//! Watch status repository.

use std::sync::Arc;

use crate::entities::{
    Anime, WatchStatus, anime,
    watch_status::{self, WatchState},
};
use anitrack_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, OnConflict},
};

fn db_err(e: sea_orm::DbErr) -> AppError {
    AppError::Database(e.to_string())
}

/// Move an anime's popularity by `delta`, never below zero.
async fn adjust_popularity<C: ConnectionTrait>(conn: &C, anime_id: &str, delta: i32) -> AppResult<()> {
    Anime::update_many()
        .col_expr(
            anime::Column::Popularity,
            Expr::cust_with_values("GREATEST(popularity + $1, 0)", [delta]),
        )
        .filter(anime::Column::Id.eq(anime_id))
        .exec(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Result of [`WatchStatusRepository::set_status`].
#[derive(Debug, Clone)]
pub struct SavedStatus {
    pub model: watch_status::Model,
    /// True when this call created the row.
    pub created: bool,
}

/// Watch status repository for database operations.
#[derive(Clone)]
pub struct WatchStatusRepository {
    db: Arc<DatabaseConnection>,
}

impl WatchStatusRepository {
    /// Create a new watch status repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the status a user set on an anime.
    pub async fn find_by_user_anime(
        &self,
        user_id: &str,
        anime_id: &str,
    ) -> AppResult<Option<watch_status::Model>> {
        WatchStatus::find()
            .filter(watch_status::Column::UserId.eq(user_id))
            .filter(watch_status::Column::AnimeId.eq(anime_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert or change a user's status on an anime.
    ///
    /// The insert ignores conflicts on `(user, anime)`, so only the call that
    /// creates the row bumps popularity. Both happen in one transaction.
    pub async fn set_status(
        &self,
        user_id: &str,
        anime_id: &str,
        status: WatchState,
        new_id: String,
    ) -> AppResult<SavedStatus> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now: DateTimeWithTimeZone = Utc::now().into();

        let model = watch_status::ActiveModel {
            id: Set(new_id),
            user_id: Set(user_id.to_string()),
            anime_id: Set(anime_id.to_string()),
            status: Set(status),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let inserted = WatchStatus::insert(model)
            .on_conflict(
                OnConflict::columns([watch_status::Column::UserId, watch_status::Column::AnimeId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(db_err)?;
        let created = inserted > 0;

        if created {
            adjust_popularity(&txn, anime_id, 1).await?;
        } else {
            WatchStatus::update_many()
                .col_expr(watch_status::Column::Status, Expr::value(status))
                .col_expr(watch_status::Column::UpdatedAt, Expr::value(now))
                .filter(watch_status::Column::UserId.eq(user_id))
                .filter(watch_status::Column::AnimeId.eq(anime_id))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        let model = WatchStatus::find()
            .filter(watch_status::Column::UserId.eq(user_id))
            .filter(watch_status::Column::AnimeId.eq(anime_id))
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound("Watch status not found".to_string()))?;

        txn.commit().await.map_err(db_err)?;
        Ok(SavedStatus { model, created })
    }

    /// Delete a user's status on an anime and drop popularity in the same
    /// transaction. Returns false when no row was deleted.
    pub async fn remove(&self, user_id: &str, anime_id: &str) -> AppResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let deleted = WatchStatus::delete_many()
            .filter(watch_status::Column::UserId.eq(user_id))
            .filter(watch_status::Column::AnimeId.eq(anime_id))
            .exec(&txn)
            .await
            .map_err(db_err)?
            .rows_affected;

        if deleted > 0 {
            adjust_popularity(&txn, anime_id, -1).await?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(deleted > 0)
    }

    /// A user's statuses, optionally filtered by state, most recently changed first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        status: Option<WatchState>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<watch_status::Model>> {
        let mut query = WatchStatus::find().filter(watch_status::Column::UserId.eq(user_id));
        if let Some(status) = status {
            query = query.filter(watch_status::Column::Status.eq(status));
        }

        query
            .order_by_desc(watch_status::Column::UpdatedAt)
            .order_by_desc(watch_status::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a user's statuses.
    pub async fn count_by_user(&self, user_id: &str, status: Option<WatchState>) -> AppResult<u64> {
        let mut query = WatchStatus::find().filter(watch_status::Column::UserId.eq(user_id));
        if let Some(status) = status {
            query = query.filter(watch_status::Column::Status.eq(status));
        }

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every status set by a user.
    pub async fn find_all_by_user(&self, user_id: &str) -> AppResult<Vec<watch_status::Model>> {
        WatchStatus::find()
            .filter(watch_status::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every status set by any of the given users.
    pub async fn find_by_users(&self, user_ids: &[String]) -> AppResult<Vec<watch_status::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        WatchStatus::find()
            .filter(watch_status::Column::UserId.is_in(user_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
