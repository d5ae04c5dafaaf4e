//! Background jobs for anitrack.
//!
//! Currently a single concern: the periodic external catalog sync. Each
//! configured job runs on its own interval and shares the sync lock with
//! CLI and admin triggers, so overlapping runs are skipped.

pub mod scheduler;

pub use scheduler::{JobExecutor, SchedulerConfig, run_scheduler};
