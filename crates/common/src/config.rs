//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Outgoing email configuration. `None` logs mail instead of sending it.
    #[serde(default)]
    pub email: Option<EmailConfig>,
    /// One-time code configuration.
    #[serde(default)]
    pub verification: VerificationConfig,
    /// External catalog sync configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Recommendation configuration.
    #[serde(default)]
    pub recommendation: RecommendationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this site.
    pub url: String,
    /// Site name used in emails.
    #[serde(default = "default_site_name")]
    pub site_name: String,
    /// Proxy addresses or CIDR ranges whose `X-Forwarded-For` and
    /// `X-Real-IP` headers are believed. Empty trusts no forwarded header.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL. When empty, an in-process cache is used.
    #[serde(default)]
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// JWT signing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret for signing tokens.
    pub secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// From address.
    pub from_address: String,
    /// From display name.
    #[serde(default = "default_site_name")]
    pub from_name: String,
}

/// One-time code and send-rate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// Code lifetime in seconds.
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: i64,
    /// Failed attempts before a code is invalidated.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Minimum seconds between two codes for the same address.
    #[serde(default = "default_send_interval")]
    pub send_interval_secs: i64,
    /// Codes per address per day.
    #[serde(default = "default_daily_per_identifier")]
    pub daily_limit_per_identifier: u32,
    /// Codes per client IP per day.
    #[serde(default = "default_daily_per_ip")]
    pub daily_limit_per_ip: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl(),
            max_attempts: default_max_attempts(),
            send_interval_secs: default_send_interval(),
            daily_limit_per_identifier: default_daily_per_identifier(),
            daily_limit_per_ip: default_daily_per_ip(),
        }
    }
}

/// External sync job configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// Endpoint returning the current season collection.
    #[serde(default)]
    pub season_url: Option<String>,
    /// Endpoint returning the weekly broadcast collection.
    #[serde(default)]
    pub weekly_url: Option<String>,
    /// Seconds between scheduled season runs (0 disables scheduling).
    #[serde(default)]
    pub season_interval_secs: u64,
    /// Seconds between scheduled weekly runs (0 disables scheduling).
    #[serde(default)]
    pub weekly_interval_secs: u64,
    /// HTTP timeout for sync requests.
    #[serde(default = "default_sync_timeout")]
    pub timeout_secs: u64,
}

/// Recommendation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    /// Cache lifetime of computed recommendation pages.
    #[serde(default = "default_recommendation_ttl")]
    pub cache_ttl_secs: i64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_recommendation_ttl(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_site_name() -> String {
    "Anitrack".to_string()
}

const fn default_max_connections() -> u32 {
    50
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "anitrack".to_string()
}

const fn default_access_ttl() -> i64 {
    30 * 60
}

const fn default_refresh_ttl() -> i64 {
    7 * 24 * 60 * 60
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_code_ttl() -> i64 {
    5 * 60
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_send_interval() -> i64 {
    60
}

const fn default_daily_per_identifier() -> u32 {
    10
}

const fn default_daily_per_ip() -> u32 {
    30
}

const fn default_sync_timeout() -> u64 {
    30
}

const fn default_recommendation_ttl() -> i64 {
    30 * 60
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `ANITRACK_ENV`)
    /// 4. Environment variables with `ANITRACK__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("ANITRACK_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ANITRACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ANITRACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let raw = r#"
            [server]
            url = "http://localhost:8000"

            [database]
            url = "postgres://localhost/anitrack"

            [redis]

            [jwt]
            secret = "secret"
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.jwt.access_ttl_secs, 1800);
        assert_eq!(config.verification.max_attempts, 5);
        assert_eq!(config.recommendation.cache_ttl_secs, 1800);
        assert!(config.email.is_none());
        assert!(config.sync.season_url.is_none());
        assert!(config.redis.url.is_empty());
        assert!(config.server.trusted_proxies.is_empty());
    }

    #[test]
    fn test_trusted_proxies_from_toml() {
        let raw = r#"
            [server]
            url = "http://localhost:8000"
            trusted_proxies = ["10.0.0.0/8", "127.0.0.1"]

            [database]
            url = "postgres://localhost/anitrack"

            [redis]

            [jwt]
            secret = "secret"
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.trusted_proxies, vec!["10.0.0.0/8", "127.0.0.1"]);
    }
}
