//! Shared key/value cache.
//!
//! Rate limit counters, one-time codes, the JWT blacklist, recommendation
//! pages and job locks all live here. Production deployments use Redis so
//! every server process sees the same counters; tests and single-node
//! development can use [`MemoryCache`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fred::clients::Client as RedisClient;
use fred::interfaces::KeysInterface;
use fred::types::{Expiration, SetOptions};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Shared handle to a cache backend.
pub type SharedCache = Arc<dyn CacheBackend>;

/// Minimal cache operations used by the services.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value, optionally expiring after `ttl_secs`.
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<i64>) -> AppResult<()>;

    /// Set a value only if the key does not exist. Returns whether it was set.
    async fn set_nx(&self, key: &str, value: &str, ttl_secs: i64) -> AppResult<bool>;

    /// Atomically increment a counter. The expiry is applied when the
    /// counter is created and left untouched afterwards.
    async fn incr(&self, key: &str, ttl_secs: i64) -> AppResult<i64>;

    /// Remaining lifetime of a key in seconds, `None` if missing or persistent.
    async fn ttl(&self, key: &str) -> AppResult<Option<i64>>;

    /// Delete a key.
    async fn del(&self, key: &str) -> AppResult<()>;

    /// Atomically read and delete a key. At most one caller sees the value.
    async fn get_del(&self, key: &str) -> AppResult<Option<String>>;
}

/// Read a JSON value from the cache.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn CacheBackend,
    key: &str,
) -> AppResult<Option<T>> {
    match cache.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AppError::Cache(format!("Failed to decode cached value: {e}"))),
        None => Ok(None),
    }
}

/// Write a JSON value to the cache.
pub async fn set_json<T: Serialize>(
    cache: &dyn CacheBackend,
    key: &str,
    value: &T,
    ttl_secs: i64,
) -> AppResult<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| AppError::Cache(format!("Failed to encode cache value: {e}")))?;
    cache.set(key, &raw, Some(ttl_secs)).await
}

/// Redis-backed cache.
#[derive(Clone)]
pub struct RedisCache {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisCache {
    /// Create a new Redis cache with the given key prefix.
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.prefix)
        }
    }
}

fn redis_err(e: fred::error::Error) -> AppError {
    AppError::Cache(e.to_string())
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.redis.get(self.key(key)).await.map_err(redis_err)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<i64>) -> AppResult<()> {
        self.redis
            .set::<(), _, _>(
                self.key(key),
                value,
                ttl_secs.map(Expiration::EX),
                None,
                false,
            )
            .await
            .map_err(redis_err)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl_secs: i64) -> AppResult<bool> {
        let result: Option<String> = self
            .redis
            .set(
                self.key(key),
                value,
                Some(Expiration::EX(ttl_secs)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(redis_err)?;
        Ok(result.is_some())
    }

    async fn incr(&self, key: &str, ttl_secs: i64) -> AppResult<i64> {
        let full_key = self.key(key);
        // Create the counter with its expiry first; INCR keeps the TTL
        self.redis
            .set::<Option<String>, _, _>(
                full_key.clone(),
                "0",
                Some(Expiration::EX(ttl_secs)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(redis_err)?;
        self.redis.incr(full_key).await.map_err(redis_err)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<i64>> {
        let ttl: i64 = self.redis.ttl(self.key(key)).await.map_err(redis_err)?;
        // -2: missing, -1: no expiry
        Ok((ttl >= 0).then_some(ttl))
    }

    async fn del(&self, key: &str) -> AppResult<()> {
        self.redis
            .del::<(), _>(self.key(key))
            .await
            .map_err(redis_err)
    }

    async fn get_del(&self, key: &str) -> AppResult<Option<String>> {
        self.redis.getdel(self.key(key)).await.map_err(redis_err)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn expiry(ttl_secs: i64) -> Option<Instant> {
    u64::try_from(ttl_secs)
        .ok()
        .map(|secs| Instant::now() + Duration::from_secs(secs))
}

/// In-process cache for tests and single-node development.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task that drops expired entries every `every`.
    pub fn spawn_cleanup(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                cache.cleanup().await;
            }
        })
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop expired entries.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        debug!(removed = before - entries.len(), "Cleaned up memory cache");
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<i64>) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: ttl_secs.and_then(expiry),
            },
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl_secs: i64) -> AppResult<bool> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| !entry.is_expired(now)) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: expiry(ttl_secs),
            },
        );
        Ok(true)
    }

    async fn incr(&self, key: &str, ttl_secs: i64) -> AppResult<i64> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let current = entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .cloned();

        let (count, expires_at) = match current {
            Some(entry) => {
                let count = entry
                    .value
                    .parse::<i64>()
                    .map_err(|_| AppError::Cache(format!("Value at {key} is not an integer")))?;
                (count + 1, entry.expires_at)
            }
            None => (1, expiry(ttl_secs)),
        };

        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<i64>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now).as_secs() as i64))
    }

    async fn del(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn get_del(&self, key: &str) -> AppResult<Option<String>> {
        let removed = self.entries.write().await.remove(key);
        Ok(removed
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value))
    }
}
