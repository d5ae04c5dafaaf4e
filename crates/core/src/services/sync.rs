//! External catalog sync.
//!
//! A run fetches one collection (current season or weekly broadcasts),
//! upserts every record by `external_id` and moves the job's flag onto
//! exactly the fetched anime. Runs of the same job are serialised with a
//! cache lock.

use std::time::Duration;

use anitrack_common::{AppError, AppResult, IdGenerator, SharedCache, config::SyncConfig};
use anitrack_db::{
    entities::sync_log::{self, SyncJob},
    repositories::{AnimeRepository, SyncLogRepository, SyncedAnime},
};
use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::Deserialize;
use serde_json::json;

use super::anime::normalize_genres;

/// Longest a lock may outlive a crashed run.
const LOCK_TTL_SECS: i64 = 600;

/// One anime record as served by the external catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncRecord {
    pub external_id: String,
    pub title: String,
    pub title_original: Option<String>,
    pub synopsis: Option<String>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub episode_count: Option<i32>,
    pub air_date: Option<NaiveDate>,
    pub weekday: Option<i16>,
}

/// Counts of one applied collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub fetched: i32,
    pub created: i32,
    pub updated: i32,
}

fn lock_key(job: SyncJob) -> String {
    format!("sync:lock:{job}")
}

fn weekday_or_none(weekday: Option<i16>) -> Option<i16> {
    weekday.filter(|d| (0..=6).contains(d))
}

/// External sync service.
#[derive(Clone)]
pub struct SyncService {
    anime_repo: AnimeRepository,
    log_repo: SyncLogRepository,
    cache: SharedCache,
    http_client: reqwest::Client,
    season_url: Option<String>,
    weekly_url: Option<String>,
    id_gen: IdGenerator,
}

impl SyncService {
    /// Create a new sync service.
    pub fn new(
        anime_repo: AnimeRepository,
        log_repo: SyncLogRepository,
        cache: SharedCache,
        config: &SyncConfig,
    ) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("anitrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            anime_repo,
            log_repo,
            cache,
            http_client,
            season_url: config.season_url.clone(),
            weekly_url: config.weekly_url.clone(),
            id_gen: IdGenerator::new(),
        })
    }

    /// Endpoint of a job, if configured.
    #[must_use]
    pub fn url_for(&self, job: SyncJob) -> Option<&str> {
        match job {
            SyncJob::Season => self.season_url.as_deref(),
            SyncJob::Weekly => self.weekly_url.as_deref(),
        }
        .filter(|url| !url.trim().is_empty())
    }

    /// Run a job once. The returned log row records whether it succeeded.
    pub async fn run(&self, job: SyncJob) -> AppResult<sync_log::Model> {
        let url = self
            .url_for(job)
            .ok_or_else(|| AppError::BadRequest(format!("Sync job {job} has no URL configured")))?
            .to_string();

        let key = lock_key(job);
        if !self.cache.set_nx(&key, "1", LOCK_TTL_SECS).await? {
            return Err(AppError::Conflict(format!("Sync job {job} is already running")));
        }

        let started_at = Utc::now();
        tracing::info!(job = %job, url = %url, "Sync started");

        let mut counts = SyncCounts::default();
        let result = match self.fetch(&url).await {
            Ok(records) => {
                let items = self.prepare(job, records);
                counts.fetched = i32::try_from(items.len()).unwrap_or(i32::MAX);
                self.anime_repo.apply_sync(job, items).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = self.cache.del(&key).await {
            tracing::warn!(error = %e, job = %job, "Failed to release sync lock");
        }

        let error_message = match &result {
            Ok(write) => {
                counts.created = write.created;
                counts.updated = write.updated;
                tracing::info!(
                    job = %job,
                    fetched = counts.fetched,
                    created = counts.created,
                    updated = counts.updated,
                    "Sync finished"
                );
                None
            }
            Err(e) => {
                // Writes are rolled back, only the fetch is recorded
                tracing::error!(error = %e, job = %job, fetched = counts.fetched, "Sync failed");
                Some(e.to_string())
            }
        };

        self.log_repo
            .create(sync_log::ActiveModel {
                id: Set(self.id_gen.generate()),
                job: Set(job),
                started_at: Set(started_at.into()),
                finished_at: Set(Some(Utc::now().into())),
                success: Set(result.is_ok()),
                fetched_count: Set(counts.fetched),
                created_count: Set(counts.created),
                updated_count: Set(counts.updated),
                error_message: Set(error_message),
            })
            .await
    }

    /// Fetch a collection from the external catalog.
    pub async fn fetch(&self, url: &str) -> AppResult<Vec<SyncRecord>> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Sync request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Sync endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<Vec<SyncRecord>>()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid sync payload: {e}")))
    }

    /// Clean up fetched records, dropping those without an ID or title.
    fn prepare(&self, job: SyncJob, records: Vec<SyncRecord>) -> Vec<SyncedAnime> {
        records
            .into_iter()
            .filter_map(|record| {
                let external_id = record.external_id.trim().to_string();
                let title = record.title.trim().to_string();
                if external_id.is_empty() || title.is_empty() {
                    tracing::warn!(job = %job, external_id = %external_id, "Skipping incomplete sync record");
                    return None;
                }
                Some(SyncedAnime {
                    new_id: self.id_gen.generate(),
                    external_id,
                    title,
                    title_original: record.title_original,
                    synopsis: record.synopsis,
                    cover_url: record.cover_url,
                    genres: json!(normalize_genres(&record.genres)),
                    episode_count: record.episode_count,
                    air_date: record.air_date,
                    weekday: weekday_or_none(record.weekday),
                })
            })
            .collect()
    }

    /// Upsert a fetched collection and move the job's flag onto it.
    ///
    /// Applied in one transaction: a failure leaves the catalog and flags as
    /// they were.
    pub async fn apply(&self, job: SyncJob, records: Vec<SyncRecord>) -> AppResult<SyncCounts> {
        let items = self.prepare(job, records);
        let fetched = i32::try_from(items.len()).unwrap_or(i32::MAX);
        let write = self.anime_repo.apply_sync(job, items).await?;
        Ok(SyncCounts {
            fetched,
            created: write.created,
            updated: write.updated,
        })
    }

    /// Recent runs, newest first.
    pub async fn recent_logs(&self, job: Option<SyncJob>, limit: u64) -> AppResult<Vec<sync_log::Model>> {
        self.log_repo.find_recent(job, limit.clamp(1, 100)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anitrack_common::{CacheBackend, MemoryCache};
    use anitrack_db::entities::anime;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_anime(id: &str, external_id: &str) -> anime::Model {
        anime::Model {
            id: id.to_string(),
            external_id: Some(external_id.to_string()),
            title: "Dungeon Meshi".to_string(),
            title_original: None,
            synopsis: None,
            cover_url: None,
            genres: json!(["Fantasy"]),
            episode_count: Some(24),
            air_date: None,
            weekday: Some(3),
            rating: 8.7,
            rating_count: 12,
            popularity: 40,
            is_admin: true,
            created_by: None,
            is_season: true,
            is_weekly: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn record(external_id: &str, title: &str) -> SyncRecord {
        SyncRecord {
            external_id: external_id.to_string(),
            title: title.to_string(),
            title_original: None,
            synopsis: None,
            cover_url: None,
            genres: vec!["Fantasy".to_string()],
            episode_count: Some(24),
            air_date: None,
            weekday: Some(9),
        }
    }

    fn exec_ok(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn service(anime_db: MockDatabase, cache: SharedCache, config: &SyncConfig) -> SyncService {
        SyncService::new(
            AnimeRepository::new(Arc::new(anime_db.into_connection())),
            SyncLogRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            cache,
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_weekday_or_none() {
        assert_eq!(weekday_or_none(Some(0)), Some(0));
        assert_eq!(weekday_or_none(Some(6)), Some(6));
        assert_eq!(weekday_or_none(Some(7)), None);
        assert_eq!(weekday_or_none(Some(-1)), None);
    }

    #[tokio::test]
    async fn test_run_without_url() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            Arc::new(MemoryCache::new()),
            &SyncConfig::default(),
        );

        let result = service.run(SyncJob::Weekly).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_concurrent_run_conflicts() {
        let cache: SharedCache = Arc::new(MemoryCache::new());
        cache.set("sync:lock:season", "1", Some(60)).await.unwrap();

        let config = SyncConfig {
            season_url: Some("http://127.0.0.1:9/season.json".to_string()),
            ..SyncConfig::default()
        };
        let service = service(MockDatabase::new(DatabaseBackend::Postgres), cache, &config);

        let result = service.run(SyncJob::Season).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_apply_creates_and_updates() {
        let anime_db = MockDatabase::new(DatabaseBackend::Postgres)
            // ext-1 exists and is updated
            .append_query_results([[create_test_anime("a1", "ext-1")]])
            .append_query_results([[create_test_anime("a1", "ext-1")]])
            // ext-2 is new
            .append_query_results([Vec::<anime::Model>::new()])
            .append_query_results([[create_test_anime("a2", "ext-2")]])
            .append_exec_results([exec_ok(1), exec_ok(2)]);
        let service = service(
            anime_db,
            Arc::new(MemoryCache::new()),
            &SyncConfig::default(),
        );

        let counts = service
            .apply(
                SyncJob::Season,
                vec![
                    record("ext-1", "Dungeon Meshi"),
                    record("ext-2", "Apothecary Diaries"),
                    record("  ", "No id"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            counts,
            SyncCounts {
                fetched: 2,
                created: 1,
                updated: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_prepare_normalises_records() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            Arc::new(MemoryCache::new()),
            &SyncConfig::default(),
        );

        let items = service.prepare(
            SyncJob::Weekly,
            vec![record(" ext-1 ", " Dungeon Meshi "), record("ext-2", "  ")],
        );

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "ext-1");
        assert_eq!(items[0].title, "Dungeon Meshi");
        assert_eq!(items[0].weekday, None);
        assert!(!items[0].new_id.is_empty());
    }

    #[tokio::test]
    async fn test_apply_failure_writes_nothing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_anime("a1", "ext-1")]])
                .append_query_results([[create_test_anime("a1", "ext-1")]])
                .append_query_errors([DbErr::Custom("connection reset".to_string())])
                .into_connection(),
        );
        let service = SyncService::new(
            AnimeRepository::new(Arc::clone(&db)),
            SyncLogRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            Arc::new(MemoryCache::new()),
            &SyncConfig::default(),
        )
        .unwrap();

        let result = service
            .apply(
                SyncJob::Season,
                vec![record("ext-1", "Dungeon Meshi"), record("ext-2", "Apothecary Diaries")],
            )
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
        drop(service);

        let log = Arc::into_inner(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let statements = log[0].statements();
        assert_eq!(statements.last().map(|s| s.sql.as_str()), Some("ROLLBACK"));
        assert!(!statements.iter().any(|s| s.sql == "COMMIT"));
    }
}
