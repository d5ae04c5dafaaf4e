//! Periodic catalog sync.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use anitrack_common::{AppError, AppResult, config::SyncConfig};
use anitrack_core::SyncService;
use anitrack_db::entities::sync_log::{self, SyncJob};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Scheduler configuration. `None` disables a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub season_interval: Option<Duration>,
    pub weekly_interval: Option<Duration>,
}

fn job_interval(url: Option<&String>, secs: u64) -> Option<Duration> {
    let configured = url.is_some_and(|u| !u.trim().is_empty());
    (configured && secs > 0).then(|| Duration::from_secs(secs))
}

impl SchedulerConfig {
    /// Jobs are scheduled only when they have both a URL and an interval.
    #[must_use]
    pub fn from_sync_config(config: &SyncConfig) -> Self {
        Self {
            season_interval: job_interval(config.season_url.as_ref(), config.season_interval_secs),
            weekly_interval: job_interval(config.weekly_url.as_ref(), config.weekly_interval_secs),
        }
    }

    /// Enabled jobs with their intervals.
    #[must_use]
    pub fn jobs(&self) -> Vec<(SyncJob, Duration)> {
        [
            (SyncJob::Season, self.season_interval),
            (SyncJob::Weekly, self.weekly_interval),
        ]
        .into_iter()
        .filter_map(|(job, every)| every.map(|every| (job, every)))
        .collect()
    }
}

/// Runs one sync job.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    async fn run_sync(&self, job: SyncJob) -> AppResult<sync_log::Model>;
}

#[async_trait::async_trait]
impl JobExecutor for SyncService {
    async fn run_sync(&self, job: SyncJob) -> AppResult<sync_log::Model> {
        self.run(job).await
    }
}

async fn tick<E: JobExecutor + ?Sized>(executor: &E, job: SyncJob) {
    match executor.run_sync(job).await {
        Ok(log) if log.success => {
            tracing::info!(
                job = %job,
                fetched = log.fetched_count,
                created = log.created_count,
                updated = log.updated_count,
                "Scheduled sync finished"
            );
        }
        Ok(log) => {
            tracing::warn!(
                job = %job,
                error = log.error_message.as_deref().unwrap_or("unknown"),
                "Scheduled sync failed"
            );
        }
        // Another trigger holds the lock
        Err(AppError::Conflict(_)) => {
            tracing::info!(job = %job, "Sync already running, skipping tick");
        }
        Err(e) => {
            tracing::error!(error = %e, job = %job, "Scheduled sync errored");
        }
    }
}

/// Spawn one task per enabled job. The first run happens immediately.
pub fn run_scheduler<E: JobExecutor + 'static>(
    config: &SchedulerConfig,
    executor: Arc<E>,
) -> Vec<JoinHandle<()>> {
    config
        .jobs()
        .into_iter()
        .map(|(job, every)| {
            let executor = executor.clone();
            tracing::info!(job = %job, interval_secs = every.as_secs(), "Scheduling sync job");
            tokio::spawn(async move {
                let mut interval = interval(every);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    tick(executor.as_ref(), job).await;
                }
            })
        })
        .collect()
}
