//! Sync log repository.

use std::sync::Arc;

use crate::entities::{
    SyncLog,
    sync_log::{self, SyncJob},
};
use anitrack_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Sync log repository for database operations.
#[derive(Clone)]
pub struct SyncLogRepository {
    db: Arc<DatabaseConnection>,
}

impl SyncLogRepository {
    /// Create a new sync log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a run.
    pub async fn create(&self, model: sync_log::ActiveModel) -> AppResult<sync_log::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Recent runs, optionally of one job, newest first.
    pub async fn find_recent(
        &self,
        job: Option<SyncJob>,
        limit: u64,
    ) -> AppResult<Vec<sync_log::Model>> {
        let mut query = SyncLog::find();
        if let Some(job) = job {
            query = query.filter(sync_log::Column::Job.eq(job));
        }

        query
            .order_by_desc(sync_log::Column::StartedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
