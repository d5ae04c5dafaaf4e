//! Anime repository.

use std::sync::Arc;

use crate::entities::{Anime, anime, sync_log::SyncJob};
use crate::repositories::user::escape_like;
use anitrack_common::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    Statement, TransactionTrait,
    sea_query::{Expr, Func, SimpleExpr},
};
use serde::Deserialize;

/// Catalog ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimeSort {
    #[default]
    Popularity,
    Rating,
    Newest,
}

/// Catalog list filters.
#[derive(Debug, Clone, Default)]
pub struct AnimeFilter {
    /// `Some(true)` curated anime, `Some(false)` user items.
    pub is_admin: Option<bool>,
    pub genre: Option<String>,
    pub is_season: Option<bool>,
    pub is_weekly: Option<bool>,
    pub weekday: Option<i16>,
    pub created_by: Option<String>,
}

/// One externally sourced anime, matched on `external_id`.
#[derive(Debug, Clone)]
pub struct SyncedAnime {
    /// ID used when a new row is created.
    pub new_id: String,
    pub external_id: String,
    pub title: String,
    pub title_original: Option<String>,
    pub synopsis: Option<String>,
    pub cover_url: Option<String>,
    pub genres: serde_json::Value,
    pub episode_count: Option<i32>,
    pub air_date: Option<NaiveDate>,
    pub weekday: Option<i16>,
}

/// Rows written by [`AnimeRepository::apply_sync`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncWrite {
    pub created: i32,
    pub updated: i32,
}

const fn sync_flag(job: SyncJob) -> anime::Column {
    match job {
        SyncJob::Season => anime::Column::IsSeason,
        SyncJob::Weekly => anime::Column::IsWeekly,
    }
}

async fn upsert_synced<C: ConnectionTrait>(
    conn: &C,
    job: SyncJob,
    item: SyncedAnime,
) -> Result<(String, bool), DbErr> {
    let now = Utc::now();
    let existing = Anime::find()
        .filter(anime::Column::ExternalId.eq(item.external_id.as_str()))
        .one(conn)
        .await?;

    if let Some(existing) = existing {
        let mut active: anime::ActiveModel = existing.into();
        active.title = Set(item.title);
        active.title_original = Set(item.title_original);
        active.synopsis = Set(item.synopsis);
        active.cover_url = Set(item.cover_url);
        active.genres = Set(item.genres);
        active.episode_count = Set(item.episode_count);
        active.air_date = Set(item.air_date);
        active.weekday = Set(item.weekday);
        active.updated_at = Set(Some(now.into()));
        let saved = active.update(conn).await?;
        return Ok((saved.id, false));
    }

    let saved = anime::ActiveModel {
        id: Set(item.new_id),
        external_id: Set(Some(item.external_id)),
        title: Set(item.title),
        title_original: Set(item.title_original),
        synopsis: Set(item.synopsis),
        cover_url: Set(item.cover_url),
        genres: Set(item.genres),
        episode_count: Set(item.episode_count),
        air_date: Set(item.air_date),
        weekday: Set(item.weekday),
        rating: Set(0.0),
        rating_count: Set(0),
        popularity: Set(0),
        is_admin: Set(true),
        created_by: Set(None),
        is_season: Set(job == SyncJob::Season),
        is_weekly: Set(job == SyncJob::Weekly),
        created_at: Set(now.into()),
        updated_at: Set(None),
    }
    .insert(conn)
    .await?;
    Ok((saved.id, true))
}

/// Set a job's flag on exactly `ids` and clear it elsewhere.
async fn replace_sync_flag<C: ConnectionTrait>(
    conn: &C,
    job: SyncJob,
    ids: &[String],
) -> Result<(), DbErr> {
    let column = sync_flag(job);

    let mut clear = Anime::update_many()
        .col_expr(column, Expr::value(false))
        .filter(column.eq(true));
    if !ids.is_empty() {
        clear = clear.filter(anime::Column::Id.is_not_in(ids.to_vec()));
    }
    clear.exec(conn).await?;

    if !ids.is_empty() {
        Anime::update_many()
            .col_expr(column, Expr::value(true))
            .filter(anime::Column::Id.is_in(ids.to_vec()))
            .exec(conn)
            .await?;
    }
    Ok(())
}

/// `genres ?| ARRAY[...]`: the jsonb array holds any of the given strings.
fn any_genre(genres: &[String]) -> SimpleExpr {
    let placeholders: Vec<String> = (1..=genres.len()).map(|i| format!("${i}")).collect();
    Expr::cust_with_values(
        format!("genres ?| ARRAY[{}]::text[]", placeholders.join(", ")),
        genres.iter().cloned(),
    )
}

/// Anime repository for database operations.
#[derive(Clone)]
pub struct AnimeRepository {
    db: Arc<DatabaseConnection>,
}

impl AnimeRepository {
    /// Create a new anime repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an anime by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<anime::Model>> {
        Anime::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an anime by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<anime::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::AnimeNotFound(id.to_string()))
    }

    /// Find anime by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<anime::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Anime::find()
            .filter(anime::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new anime.
    pub async fn create(&self, model: anime::ActiveModel) -> AppResult<anime::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an anime.
    pub async fn update(&self, model: anime::ActiveModel) -> AppResult<anime::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an anime (episodes, characters and watch statuses cascade).
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Anime::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    fn filtered(filter: &AnimeFilter) -> Select<Anime> {
        let mut query = Anime::find();

        if let Some(is_admin) = filter.is_admin {
            query = query.filter(anime::Column::IsAdmin.eq(is_admin));
        }
        if let Some(genre) = &filter.genre {
            query = query.filter(Expr::cust_with_values(
                "genres @> $1",
                [serde_json::json!([genre])],
            ));
        }
        if let Some(is_season) = filter.is_season {
            query = query.filter(anime::Column::IsSeason.eq(is_season));
        }
        if let Some(is_weekly) = filter.is_weekly {
            query = query.filter(anime::Column::IsWeekly.eq(is_weekly));
        }
        if let Some(weekday) = filter.weekday {
            query = query.filter(anime::Column::Weekday.eq(weekday));
        }
        if let Some(created_by) = &filter.created_by {
            query = query.filter(anime::Column::CreatedBy.eq(created_by.as_str()));
        }

        query
    }

    /// List anime matching a filter.
    pub async fn list(
        &self,
        filter: &AnimeFilter,
        sort: AnimeSort,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<anime::Model>> {
        let query = Self::filtered(filter);
        let query = match sort {
            AnimeSort::Popularity => query.order_by_desc(anime::Column::Popularity),
            AnimeSort::Rating => query.order_by_desc(anime::Column::Rating),
            AnimeSort::Newest => query.order_by_desc(anime::Column::CreatedAt),
        };

        query
            .order_by_desc(anime::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count anime matching a filter.
    pub async fn count(&self, filter: &AnimeFilter) -> AppResult<u64> {
        Self::filtered(filter)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every entry of one kind whose genres share at least one of `genres`,
    /// excluding the given IDs.
    pub async fn find_by_any_genre(
        &self,
        is_admin: bool,
        genres: &[String],
        exclude: &[String],
    ) -> AppResult<Vec<anime::Model>> {
        if genres.is_empty() {
            return Ok(vec![]);
        }

        let mut query = Anime::find()
            .filter(anime::Column::IsAdmin.eq(is_admin))
            .filter(any_genre(genres));
        if !exclude.is_empty() {
            query = query.filter(anime::Column::Id.is_not_in(exclude.to_vec()));
        }

        query
            .order_by_asc(anime::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Top entries of one kind by `0.7 * popularity / 1000 + 0.3 * rating / 10`.
    pub async fn find_top_blended(&self, is_admin: bool, limit: u64) -> AppResult<Vec<anime::Model>> {
        Anime::find()
            .filter(anime::Column::IsAdmin.eq(is_admin))
            .order_by_desc(Expr::cust(
                "(0.7 * popularity::double precision / 1000.0 + 0.3 * rating / 10.0)",
            ))
            .order_by_asc(anime::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search titles and synopsis, full-text first with a LIKE fallback.
    pub async fn search(
        &self,
        query: &str,
        is_admin: bool,
        limit: u64,
    ) -> AppResult<Vec<anime::Model>> {
        match self.search_fulltext(query, is_admin, limit).await {
            Ok(results) => Ok(results),
            Err(e) => {
                tracing::warn!(error = %e, "Full-text anime search failed, falling back to LIKE");
                self.search_like(query, is_admin, limit).await
            }
        }
    }

    /// Full-text search using `PostgreSQL` tsvector/tsquery over the GIN index.
    pub async fn search_fulltext(
        &self,
        query: &str,
        is_admin: bool,
        limit: u64,
    ) -> AppResult<Vec<anime::Model>> {
        let sql = r"
            SELECT *
            FROM anime
            WHERE is_admin = $2
                AND to_tsvector(
                    'simple',
                    COALESCE(title, '') || ' ' || COALESCE(title_original, '') || ' ' || COALESCE(synopsis, '')
                ) @@ plainto_tsquery('simple', $1)
            ORDER BY popularity DESC, id ASC
            LIMIT $3
        ";

        Anime::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                [query.into(), is_admin.into(), (limit as i64).into()],
            ))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Case-insensitive substring search over both titles.
    pub async fn search_like(
        &self,
        query: &str,
        is_admin: bool,
        limit: u64,
    ) -> AppResult<Vec<anime::Model>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        Anime::find()
            .filter(anime::Column::IsAdmin.eq(is_admin))
            .filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(anime::Column::Title))).like(&pattern))
                    .add(
                        Expr::expr(Func::lower(Expr::col(anime::Column::TitleOriginal)))
                            .like(&pattern),
                    ),
            )
            .order_by_desc(anime::Column::Popularity)
            .order_by_asc(anime::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upsert a synced collection by `external_id` and move the job's flag
    /// onto exactly those rows.
    ///
    /// Everything runs in one transaction; on error nothing is written and the
    /// previous flags stay in place.
    pub async fn apply_sync(&self, job: SyncJob, items: Vec<SyncedAnime>) -> AppResult<SyncWrite> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut write = SyncWrite::default();
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let (id, created) = upsert_synced(&txn, job, item)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            if created {
                write.created += 1;
            } else {
                write.updated += 1;
            }
            ids.push(id);
        }

        replace_sync_flag(&txn, job, &ids)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(write)
    }
}
