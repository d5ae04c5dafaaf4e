//! Anitrack server entry point.

mod cli;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anitrack_api::{AppState, router as api_router};
use anitrack_common::{Config, MemoryCache, RedisCache, SharedCache};
use anitrack_core::mailer_from_config;
use anitrack_db::entities::sync_log::SyncJob;
use anitrack_queue::{SchedulerConfig, run_scheduler};
use anyhow::Context;
use axum::Router;
use clap::Parser;
use fred::prelude::*;
use tokio::{signal, task::JoinHandle};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

/// How often expired entries are swept from the in-process cache.
const MEMORY_CACHE_SWEEP: Duration = Duration::from_secs(60);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "anitrack=debug,tower_http=debug".into());

    let json = std::env::var("ANITRACK_LOG_JSON").is_ok_and(|v| v != "0" && !v.is_empty());
    let (json_layer, text_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

/// Redis when a URL is configured, otherwise an in-process cache with a
/// background sweeper for expired entries.
async fn connect_cache(config: &Config) -> anyhow::Result<(SharedCache, Option<JoinHandle<()>>)> {
    if config.redis.url.trim().is_empty() {
        info!("No Redis URL configured, using in-memory cache");
        let cache = MemoryCache::new();
        let sweeper = cache.spawn_cleanup(MEMORY_CACHE_SWEEP);
        return Ok((Arc::new(cache), Some(sweeper)));
    }

    let redis_config = fred::types::config::Config::from_url(&config.redis.url)
        .context("Failed to parse Redis URL")?;
    let client = fred::clients::Client::new(redis_config, None, None, None);
    client.connect();
    client
        .wait_for_connect()
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis");

    let cache = RedisCache::new(Arc::new(client), config.redis.prefix.clone());
    Ok((Arc::new(cache), None))
}

/// Application state plus the background tasks it owns.
struct Runtime {
    state: AppState,
    tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

async fn build_state(config: &Config) -> anyhow::Result<Runtime> {
    let db = anitrack_db::init(config).await?;
    info!("Connected to database");

    let (cache, sweeper) = connect_cache(config).await?;
    let mailer = mailer_from_config(config.email.as_ref())?;

    Ok(Runtime {
        state: AppState::new(Arc::new(db), cache, mailer, config)?,
        tasks: sweeper.into_iter().collect(),
    })
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    let db = anitrack_db::init(config).await?;
    info!("Running database migrations...");
    anitrack_db::migrate(&db).await?;
    info!("Migrations completed");
    Ok(())
}

async fn serve(config: Config, run_migrations: bool) -> anyhow::Result<()> {
    if run_migrations {
        migrate(&config).await?;
    }

    let mut runtime = build_state(&config).await?;

    let scheduler = SchedulerConfig::from_sync_config(&config.sync);
    let jobs = run_scheduler(&scheduler, Arc::new(runtime.state.sync_service.clone()));
    info!(jobs = jobs.len(), "Sync scheduler started");
    runtime.tasks.extend(jobs);

    let app = Router::new()
        .nest("/api", api_router(runtime.state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server host/port")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    runtime.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

async fn sync_once(config: &Config, job: SyncJob) -> anyhow::Result<()> {
    let runtime = build_state(config).await?;
    let log = runtime.state.sync_service.run(job).await;
    runtime.shutdown();
    let log = log?;

    if log.success {
        info!(
            job = %job,
            fetched = log.fetched_count,
            created = log.created_count,
            updated = log.updated_count,
            "Sync finished"
        );
        Ok(())
    } else {
        anyhow::bail!(
            "sync {job} failed: {}",
            log.error_message.unwrap_or_default()
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve { no_migrate: false }) {
        Commands::Serve { no_migrate } => {
            info!("Starting anitrack server...");
            serve(config, !no_migrate).await
        }
        Commands::Migrate => migrate(&config).await,
        Commands::Sync { job } => sync_once(&config, job.into()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anitrack_common::CacheBackend;

    fn config_without_redis() -> Config {
        let raw = r#"
            [server]
            url = "http://localhost:8000"

            [database]
            url = "postgres://localhost/anitrack"

            [redis]

            [jwt]
            secret = "secret"
        "#;
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[tokio::test]
    async fn test_memory_cache_starts_sweeper() {
        let (cache, sweeper) = connect_cache(&config_without_redis()).await.unwrap();
        let sweeper = sweeper.expect("in-memory cache should be swept");
        assert!(!sweeper.is_finished());

        cache.set("k", "v", Some(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        sweeper.abort();
    }
}
