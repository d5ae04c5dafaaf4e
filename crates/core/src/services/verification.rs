//! One-time email codes and their send limits.
//!
//! Codes are six digits, stored SHA-256 hashed under `otp:{purpose}:{email}`
//! and consumed on first successful use. Sending is limited per address
//! (interval and daily) and per client IP (daily); all counters live in the
//! shared cache so every server process enforces the same limits.

use std::fmt;

use anitrack_common::{AppError, AppResult, SharedCache, config::VerificationConfig};
use anitrack_db::repositories::UserRepository;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use validator::ValidateEmail;

use super::email::EmailService;

const DAY_SECS: i64 = 24 * 60 * 60;

/// What a one-time code authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePurpose {
    Register,
    Login,
    ResetPassword,
    ChangeContact,
}

impl CodePurpose {
    /// Key segment for this purpose.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::ResetPassword => "reset_password",
            Self::ChangeContact => "change_contact",
        }
    }

    /// Whether the address must not belong to an account yet.
    const fn requires_unused(self) -> bool {
        matches!(self, Self::Register | Self::ChangeContact)
    }
}

impl fmt::Display for CodePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize an email address for lookups and cache keys.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

fn codes_match(given: &str, stored: &str) -> bool {
    bool::from(given.as_bytes().ct_eq(stored.as_bytes()))
}

fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

fn code_key(purpose: CodePurpose, email: &str) -> String {
    format!("otp:{purpose}:{email}")
}

fn attempts_key(purpose: CodePurpose, email: &str) -> String {
    format!("otp:attempts:{purpose}:{email}")
}

/// Issues and checks one-time codes.
#[derive(Clone)]
pub struct VerificationService {
    cache: SharedCache,
    user_repo: UserRepository,
    email: EmailService,
    config: VerificationConfig,
}

impl VerificationService {
    /// Create a new verification service.
    #[must_use]
    pub const fn new(
        cache: SharedCache,
        user_repo: UserRepository,
        email: EmailService,
        config: VerificationConfig,
    ) -> Self {
        Self {
            cache,
            user_repo,
            email,
            config,
        }
    }

    async fn retry_after(&self, key: &str, fallback: i64) -> AppResult<u64> {
        let ttl = self.cache.ttl(key).await?.unwrap_or(fallback);
        Ok(ttl.max(1) as u64)
    }

    /// Apply the interval, per-address and per-IP limits for one send.
    async fn check_send_limits(&self, email: &str, ip: Option<&str>) -> AppResult<()> {
        let interval_key = format!("otp:interval:{email}");
        let interval = self.config.send_interval_secs;
        if !self.cache.set_nx(&interval_key, "1", interval).await? {
            return Err(AppError::RateLimited {
                retry_after: self.retry_after(&interval_key, interval).await?,
            });
        }

        let daily_key = format!("otp:daily:{email}");
        let sent_today = self.cache.incr(&daily_key, DAY_SECS).await?;
        if sent_today > i64::from(self.config.daily_limit_per_identifier) {
            tracing::info!(email = %email, "Daily code limit reached for address");
            return Err(AppError::RateLimited {
                retry_after: self.retry_after(&daily_key, DAY_SECS).await?,
            });
        }

        if let Some(ip) = ip {
            let ip_key = format!("otp:daily_ip:{ip}");
            let sent_from_ip = self.cache.incr(&ip_key, DAY_SECS).await?;
            if sent_from_ip > i64::from(self.config.daily_limit_per_ip) {
                tracing::info!(ip = %ip, "Daily code limit reached for client IP");
                return Err(AppError::RateLimited {
                    retry_after: self.retry_after(&ip_key, DAY_SECS).await?,
                });
            }
        }

        Ok(())
    }

    async fn check_purpose(&self, purpose: CodePurpose, email: &str) -> AppResult<()> {
        let existing = self.user_repo.find_by_email(email).await?;

        if purpose.requires_unused() {
            if existing.is_some() {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
            return Ok(());
        }

        match existing {
            Some(user) if user.is_active => Ok(()),
            _ => Err(AppError::UserNotFound(email.to_string())),
        }
    }

    /// Generate, store and email a code.
    pub async fn send_code(
        &self,
        purpose: CodePurpose,
        email: &str,
        ip: Option<&str>,
    ) -> AppResult<()> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }

        self.check_send_limits(&email, ip).await?;
        self.check_purpose(purpose, &email).await?;

        let code = generate_code();
        let key = code_key(purpose, &email);
        let ttl = self.config.code_ttl_secs;

        self.cache.set(&key, &hash_code(&code), Some(ttl)).await?;
        self.cache.del(&attempts_key(purpose, &email)).await?;

        if let Err(e) = self.email.send_code(&email, purpose, &code, ttl).await {
            tracing::warn!(error = %e, email = %email, "Failed to deliver verification code");
            self.cache.del(&key).await?;
            return Err(e);
        }

        tracing::info!(purpose = %purpose, email = %email, "Sent verification code");
        Ok(())
    }

    /// Check a code. A correct code is consumed; too many wrong guesses
    /// invalidate the stored code.
    pub async fn verify_code(&self, purpose: CodePurpose, email: &str, code: &str) -> AppResult<()> {
        let email = normalize_email(email);
        let key = code_key(purpose, &email);
        let attempts = attempts_key(purpose, &email);

        let Some(stored) = self.cache.get(&key).await? else {
            return Err(AppError::BadRequest(
                "Verification code expired or not requested".to_string(),
            ));
        };

        let given = hash_code(code.trim());
        if codes_match(&given, &stored) {
            // Claim the code; only one concurrent submission gets it back
            return match self.cache.get_del(&key).await? {
                Some(claimed) if codes_match(&given, &claimed) => {
                    self.cache.del(&attempts).await?;
                    Ok(())
                }
                Some(newer) => {
                    // A fresh code replaced the one that was checked
                    self.cache
                        .set(&key, &newer, Some(self.config.code_ttl_secs))
                        .await?;
                    Err(AppError::BadRequest("Invalid verification code".to_string()))
                }
                None => Err(AppError::BadRequest(
                    "Verification code expired or not requested".to_string(),
                )),
            };
        }

        let failures = self.cache.incr(&attempts, self.config.code_ttl_secs).await?;
        if failures >= i64::from(self.config.max_attempts) {
            tracing::info!(purpose = %purpose, email = %email, "Code invalidated after repeated failures");
            self.cache.del(&key).await?;
            self.cache.del(&attempts).await?;
            return Err(AppError::BadRequest(
                "Too many failed attempts, request a new code".to_string(),
            ));
        }

        Err(AppError::BadRequest("Invalid verification code".to_string()))
    }
}
