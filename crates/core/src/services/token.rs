//! JWT access and refresh tokens.
//!
//! Tokens are HS256-signed. Refresh tokens rotate: every refresh blacklists
//! the presented token until it would have expired anyway. A per-user cutoff
//! invalidates every token issued before a password change or reset.

use anitrack_common::{AppError, AppResult, IdGenerator, SharedCache, config::JwtConfig};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Kind of token carried in the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// Unique token ID, used for blacklisting.
    pub jti: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    /// Issue time in milliseconds, compared against the user's cutoff.
    #[serde(default)]
    pub iat_ms: i64,
}

/// Token pair returned on login, registration and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

fn blacklist_key(jti: &str) -> String {
    format!("jwt:blacklist:{jti}")
}

fn valid_after_key(user_id: &str) -> String {
    format!("jwt:valid_after:{user_id}")
}

/// Service for issuing and validating tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    cache: SharedCache,
    id_gen: IdGenerator,
}

impl TokenService {
    /// Create a new token service.
    #[must_use]
    pub fn new(config: &JwtConfig, cache: SharedCache) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
            cache,
            id_gen: IdGenerator::new(),
        }
    }

    fn sign(&self, user_id: &str, token_type: TokenType) -> AppResult<String> {
        let now_ms = Utc::now().timestamp_millis();
        let now = now_ms / 1000;
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            jti: self.id_gen.generate_token(),
            token_type,
            iat: now,
            exp: now + ttl,
            iat_ms: now_ms,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Issue a fresh access/refresh pair for a user.
    pub fn issue(&self, user_id: &str) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(user_id, TokenType::Access)?,
            refresh_token: self.sign(user_id, TokenType::Refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl_secs,
        })
    }

    /// Decode a token, checking signature, expiry and type. Does not consult
    /// the blacklist.
    pub fn decode(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected token");
                AppError::InvalidToken
            })?;

        if claims.token_type != expected {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }

    /// Decode a token and reject it if it has been revoked, either by itself
    /// or by a cutoff on its user.
    pub async fn verify(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let claims = self.decode(token, expected)?;
        if self.cache.get(&blacklist_key(&claims.jti)).await?.is_some() {
            return Err(AppError::InvalidToken);
        }

        if let Some(cutoff) = self.cache.get(&valid_after_key(&claims.sub)).await? {
            let cutoff: i64 = cutoff
                .parse()
                .map_err(|_| AppError::Cache("Corrupt token cutoff".to_string()))?;
            if claims.iat_ms < cutoff {
                return Err(AppError::InvalidToken);
            }
        }
        Ok(claims)
    }

    /// Blacklist a token for the rest of its lifetime. Returns `false` when it
    /// was already blacklisted.
    pub async fn revoke(&self, claims: &Claims) -> AppResult<bool> {
        let remaining = claims.exp - Utc::now().timestamp();
        self.cache
            .set_nx(&blacklist_key(&claims.jti), "1", remaining.max(1))
            .await
    }

    /// Invalidate every token issued to a user until now.
    pub async fn revoke_all(&self, user_id: &str) -> AppResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        // Older tokens are expired after the longest lifetime anyway
        let ttl = self.refresh_ttl_secs.max(self.access_ttl_secs);
        self.cache
            .set(&valid_after_key(user_id), &now_ms.to_string(), Some(ttl))
            .await?;
        tracing::info!(user_id = %user_id, "Revoked all tokens");
        Ok(())
    }

    /// Exchange a refresh token for a new pair, revoking the old one.
    ///
    /// The old token is claimed atomically, so concurrent refreshes of the
    /// same token yield at most one new pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<(String, TokenPair)> {
        let claims = self.verify(refresh_token, TokenType::Refresh).await?;
        if !self.revoke(&claims).await? {
            return Err(AppError::InvalidToken);
        }
        let pair = self.issue(&claims.sub)?;
        Ok((claims.sub, pair))
    }

    /// Revoke a refresh token. Only the token's owner may revoke it.
    pub async fn logout(&self, user_id: &str, refresh_token: &str) -> AppResult<()> {
        let claims = self.verify(refresh_token, TokenType::Refresh).await?;
        if claims.sub != user_id {
            return Err(AppError::Forbidden(
                "Token belongs to another user".to_string(),
            ));
        }
        self.revoke(&claims).await?;
        Ok(())
    }
}
