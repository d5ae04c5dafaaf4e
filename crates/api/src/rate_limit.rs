//! Per-request rate limiting.
//!
//! Counters live in the shared cache so limits hold across processes when
//! Redis is configured. Signed-in callers are keyed by user ID, anonymous
//! callers by client IP.

#![allow(missing_docs)]

use anitrack_common::{AppError, SharedCache};
use anitrack_db::entities::user;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    extractors::{TrustedProxies, client_ip},
    middleware::AppState,
};

/// Fixed-window limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Bucket name, part of the counter key.
    pub scope: &'static str,
    pub max_requests: u32,
    pub window_secs: i64,
}

impl RateLimitConfig {
    pub const fn new(scope: &'static str, max_requests: u32, window_secs: i64) -> Self {
        Self {
            scope,
            max_requests,
            window_secs,
        }
    }
}

/// Default limits per route group.
pub mod limits {
    use super::RateLimitConfig;

    /// Every API route.
    pub const STANDARD: RateLimitConfig = RateLimitConfig::new("std", 300, 60);

    /// Login, registration and token endpoints.
    pub const AUTH: RateLimitConfig = RateLimitConfig::new("auth", 20, 300);
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed {
        remaining: u32,
        limit: u32,
        reset: u64,
    },
    Limited {
        retry_after: u64,
    },
}

/// Cache-backed fixed-window limiter.
#[derive(Clone)]
pub struct ApiRateLimiter {
    cache: SharedCache,
}

impl ApiRateLimiter {
    #[must_use]
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }

    /// Count one request against `key` and report whether it may proceed.
    pub async fn check(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, AppError> {
        let counter = format!("ratelimit:{}:{key}", config.scope);
        let count = self.cache.incr(&counter, config.window_secs).await?;
        let reset = self
            .cache
            .ttl(&counter)
            .await?
            .filter(|ttl| *ttl > 0)
            .unwrap_or(config.window_secs)
            .unsigned_abs();

        let limit = config.max_requests;
        if count > i64::from(limit) {
            return Ok(RateLimitResult::Limited {
                retry_after: reset.max(1),
            });
        }

        let used = u32::try_from(count).unwrap_or(limit);
        Ok(RateLimitResult::Allowed {
            remaining: limit.saturating_sub(used),
            limit,
            reset,
        })
    }
}

fn limiter_key(req: &Request<Body>, trusted: &TrustedProxies) -> String {
    // User set by the auth middleware, which runs first
    if let Some(user) = req.extensions().get::<user::Model>() {
        format!("user:{}", user.id)
    } else if let Some(ip) = client_ip(req.headers(), req.extensions(), trusted) {
        format!("ip:{ip}")
    } else {
        "unknown".to_string()
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    rate_limit_with_config(&state, req, next, &limits::STANDARD).await
}

pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    rate_limit_with_config(&state, req, next, &limits::AUTH).await
}

async fn rate_limit_with_config(
    state: &AppState,
    req: Request<Body>,
    next: Next,
    config: &RateLimitConfig,
) -> Response {
    let key = limiter_key(&req, &state.trusted_proxies);

    match state.rate_limiter.check(&key, config).await {
        Ok(RateLimitResult::Allowed {
            remaining,
            limit,
            reset,
        }) => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
            headers.insert("X-RateLimit-Reset", HeaderValue::from(reset));
            response
        }
        Ok(RateLimitResult::Limited { retry_after }) => {
            tracing::debug!(key = %key, scope = config.scope, "Request rate limited");
            AppError::RateLimited { retry_after }.into_response()
        }
        Err(e) => {
            // Fail open when the counter store is unavailable
            tracing::warn!(error = %e, "Rate limiter unavailable");
            next.run(req).await
        }
    }
}
