//! Command-line interface.

use anitrack_db::entities::sync_log::SyncJob;
use clap::{Parser, Subcommand, ValueEnum};

/// Anitrack - social anime tracking service
#[derive(Debug, Parser)]
#[command(name = "anitrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run migrations, then serve the HTTP API and the sync scheduler
    Serve {
        /// Skip running migrations on startup
        #[arg(long)]
        no_migrate: bool,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Run one catalog sync job now
    Sync {
        #[arg(value_enum)]
        job: SyncJobArg,
    },
}

/// Sync job selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncJobArg {
    Season,
    Weekly,
}

impl From<SyncJobArg> for SyncJob {
    fn from(arg: SyncJobArg) -> Self {
        match arg {
            SyncJobArg::Season => Self::Season,
            SyncJobArg::Weekly => Self::Weekly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_job() {
        let cli = Cli::try_parse_from(["anitrack", "sync", "weekly"]).unwrap();
        match cli.command {
            Some(Commands::Sync { job }) => assert_eq!(SyncJob::from(job), SyncJob::Weekly),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_serve_is_optional() {
        let cli = Cli::try_parse_from(["anitrack"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["anitrack", "serve", "--no-migrate"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { no_migrate: true })));
    }

    #[test]
    fn test_unknown_sync_job_is_rejected() {
        assert!(Cli::try_parse_from(["anitrack", "sync", "monthly"]).is_err());
    }
}
