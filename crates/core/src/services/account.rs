//! Account service: registration, sign-in, credentials and profiles.

use std::collections::HashMap;

use anitrack_common::{AppError, AppResult, IdGenerator};
use anitrack_db::{
    entities::{user, user_profile},
    repositories::{UserBanRepository, UserFollowRepository, UserProfileRepository, UserRepository},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use super::token::{TokenPair, TokenService};
use super::verification::{CodePurpose, VerificationService, normalize_email};

#[allow(clippy::unwrap_used)]
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,20}$").unwrap());

/// Input for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(regex(path = *USERNAME_RE, message = "3-20 letters, digits or underscores"))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

/// Input for password sign-in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    /// Username or email.
    #[validate(length(min = 1, max = 256))]
    pub login: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Input for a password reset.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Input for a password change.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordInput {
    #[serde(default)]
    pub old_password: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Input for an email change. The code is sent to the new address.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangeEmailInput {
    #[validate(email)]
    pub new_email: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

/// Partial profile update. Empty strings clear a field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(max = 64))]
    pub nickname: Option<String>,
    #[validate(length(max = 2048))]
    pub avatar_url: Option<String>,
    #[validate(length(max = 1024))]
    pub bio: Option<String>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    #[validate(length(max = 128))]
    pub location: Option<String>,
}

/// Tokens plus the signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: user::Model,
    pub tokens: TokenPair,
}

/// Public view of a user with profile fields and social counts.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub is_admin: bool,
    pub followers_count: u64,
    pub followings_count: u64,
    /// The viewer follows this user.
    pub is_following: bool,
    /// This user follows the viewer.
    pub is_followed_by: bool,
    pub is_mutual: bool,
    pub created_at: DateTime<FixedOffset>,
}

/// Compact user reference used in lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}

/// Build summaries for the given users, keeping the order of `ids` and
/// skipping users that no longer exist.
pub async fn summarize_users(
    user_repo: &UserRepository,
    profile_repo: &UserProfileRepository,
    ids: &[String],
) -> AppResult<Vec<UserSummary>> {
    let users: HashMap<String, user::Model> = user_repo
        .find_by_ids(ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();
    let profiles: HashMap<String, user_profile::Model> = profile_repo
        .find_by_user_ids(ids)
        .await?
        .into_iter()
        .map(|p| (p.user_id.clone(), p))
        .collect();

    Ok(ids
        .iter()
        .filter_map(|id| {
            let user = users.get(id)?;
            let profile = profiles.get(id);
            Some(UserSummary {
                id: user.id.clone(),
                username: user.username.clone(),
                nickname: profile.and_then(|p| p.nickname.clone()),
                avatar_url: profile.and_then(|p| p.avatar_url.clone()),
            })
        })
        .collect())
}

fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Account service for business logic.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    follow_repo: UserFollowRepository,
    ban_repo: UserBanRepository,
    tokens: TokenService,
    verification: VerificationService,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
        follow_repo: UserFollowRepository,
        ban_repo: UserBanRepository,
        tokens: TokenService,
        verification: VerificationService,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            follow_repo,
            ban_repo,
            tokens,
            verification,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account after checking the emailed code.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        input.validate()?;
        let email = normalize_email(&input.email);

        if self.user_repo.find_by_username(&input.username).await?.is_some() {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        self.verification
            .verify_code(CodePurpose::Register, &email, &input.code)
            .await?;

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();
        let user_id = self.id_gen.generate();

        let model = user::ActiveModel {
            id: Set(user_id.clone()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(Some(email)),
            password_hash: Set(Some(password_hash)),
            is_admin: Set(false),
            is_active: Set(true),
            is_banned: Set(false),
            ban_reason: Set(None),
            banned_until: Set(None),
            last_login_at: Set(Some(now.into())),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };
        let user = self.user_repo.create(model).await?;

        let profile = user_profile::ActiveModel {
            user_id: Set(user_id),
            nickname: Set(Some(input.username)),
            avatar_url: Set(None),
            bio: Set(None),
            gender: Set(None),
            location: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };
        self.profile_repo.create(profile).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered new account");

        let tokens = self.tokens.issue(&user.id)?;
        Ok(AuthResponse { user, tokens })
    }

    /// Sign in with username or email and password.
    pub async fn login_password(&self, input: LoginInput) -> AppResult<AuthResponse> {
        input.validate()?;

        let user = self
            .user_repo
            .find_by_login(input.login.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AppError::Unauthorized);
        };
        if !verify_password(&input.password, hash)? {
            return Err(AppError::Unauthorized);
        }

        self.sign_in(user).await
    }

    /// Sign in with an emailed code.
    pub async fn login_code(&self, email: &str, code: &str) -> AppResult<AuthResponse> {
        let email = normalize_email(email);
        self.verification
            .verify_code(CodePurpose::Login, &email, code)
            .await?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::UserNotFound(email.clone()))?;

        self.sign_in(user).await
    }

    async fn sign_in(&self, user: user::Model) -> AppResult<AuthResponse> {
        let user = self.check_access(user).await?;

        let mut active: user::ActiveModel = user.into();
        active.last_login_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update(active).await?;

        let tokens = self.tokens.issue(&user.id)?;
        Ok(AuthResponse { user, tokens })
    }

    /// Set a new password using an emailed code.
    pub async fn reset_password(&self, input: ResetPasswordInput) -> AppResult<()> {
        input.validate()?;
        let email = normalize_email(&input.email);

        self.verification
            .verify_code(CodePurpose::ResetPassword, &email, &input.code)
            .await?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::UserNotFound(email.clone()))?;

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(Some(hash_password(&input.new_password)?));
        active.updated_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update(active).await?;
        self.tokens.revoke_all(&user.id).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Change the password of a signed-in user. Every token issued before the
    /// change stops working, the caller's included.
    ///
    /// Accounts created without a password may set one without the old value.
    pub async fn change_password(&self, user_id: &str, input: ChangePasswordInput) -> AppResult<()> {
        input.validate()?;
        let user = self.user_repo.get_by_id(user_id).await?;

        if let Some(hash) = user.password_hash.as_deref() {
            let old = input.old_password.as_deref().unwrap_or_default();
            if !verify_password(old, hash)? {
                return Err(AppError::BadRequest(
                    "Current password is incorrect".to_string(),
                ));
            }
        }

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(Some(hash_password(&input.new_password)?));
        active.updated_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update(active).await?;
        self.tokens.revoke_all(&user.id).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Move an account to a new email address.
    pub async fn change_email(&self, user_id: &str, input: ChangeEmailInput) -> AppResult<user::Model> {
        input.validate()?;
        let new_email = normalize_email(&input.new_email);
        if !new_email.validate_email() {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        if user.email.as_deref() == Some(new_email.as_str()) {
            return Err(AppError::BadRequest(
                "New email is the same as the current one".to_string(),
            ));
        }
        if self.user_repo.find_by_email(&new_email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        self.verification
            .verify_code(CodePurpose::ChangeContact, &new_email, &input.code)
            .await?;

        let mut active: user::ActiveModel = user.into();
        active.email = Set(Some(new_email));
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await
    }

    /// Resolve a token subject to a user allowed to act.
    pub async fn authenticate(&self, user_id: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        self.check_access(user).await
    }

    /// Reject deactivated or banned users, lifting bans that have run out.
    async fn check_access(&self, user: user::Model) -> AppResult<user::Model> {
        if !user.is_active {
            return Err(AppError::Forbidden("Account is deactivated".to_string()));
        }
        if !user.is_banned {
            return Ok(user);
        }

        if user.is_ban_active(Utc::now().into()) {
            let reason = user
                .ban_reason
                .clone()
                .unwrap_or_else(|| "No reason given".to_string());
            return Err(AppError::Banned(reason));
        }

        // The ban ran out since the last request
        self.ban_repo.lift_all(&user.id, None).await?;
        let user = self.user_repo.clear_ban(user).await?;
        tracing::info!(user_id = %user.id, "Lifted expired ban");
        Ok(user)
    }

    /// Profile of a user as seen by an optional viewer.
    pub async fn get_profile(&self, viewer_id: Option<&str>, user_id: &str) -> AppResult<ProfileResponse> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if !user.is_active {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }

        let profile = self.profile_repo.find_by_user_id(user_id).await?;
        let followers_count = self.follow_repo.count_followers(user_id).await?;
        let followings_count = self.follow_repo.count_followings(user_id).await?;

        let (is_following, is_followed_by) = match viewer_id {
            Some(viewer) if viewer != user_id => (
                self.follow_repo.is_following(viewer, user_id).await?,
                self.follow_repo.is_following(user_id, viewer).await?,
            ),
            _ => (false, false),
        };

        Ok(ProfileResponse {
            id: user.id,
            username: user.username,
            nickname: profile.as_ref().and_then(|p| p.nickname.clone()),
            avatar_url: profile.as_ref().and_then(|p| p.avatar_url.clone()),
            bio: profile.as_ref().and_then(|p| p.bio.clone()),
            gender: profile.as_ref().and_then(|p| p.gender.clone()),
            location: profile.as_ref().and_then(|p| p.location.clone()),
            is_admin: user.is_admin,
            followers_count,
            followings_count,
            is_following,
            is_followed_by,
            is_mutual: is_following && is_followed_by,
            created_at: user.created_at,
        })
    }

    /// Update the caller's profile.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<ProfileResponse> {
        input.validate()?;
        let now = Utc::now();

        match self.profile_repo.find_by_user_id(user_id).await? {
            Some(profile) => {
                let mut active: user_profile::ActiveModel = profile.into();
                if let Some(nickname) = input.nickname {
                    active.nickname = Set(blank_to_none(nickname));
                }
                if let Some(avatar_url) = input.avatar_url {
                    active.avatar_url = Set(blank_to_none(avatar_url));
                }
                if let Some(bio) = input.bio {
                    active.bio = Set(blank_to_none(bio));
                }
                if let Some(gender) = input.gender {
                    active.gender = Set(blank_to_none(gender));
                }
                if let Some(location) = input.location {
                    active.location = Set(blank_to_none(location));
                }
                active.updated_at = Set(Some(now.into()));
                self.profile_repo.update(active).await?;
            }
            None => {
                self.user_repo.get_by_id(user_id).await?;
                let model = user_profile::ActiveModel {
                    user_id: Set(user_id.to_string()),
                    nickname: Set(input.nickname.and_then(blank_to_none)),
                    avatar_url: Set(input.avatar_url.and_then(blank_to_none)),
                    bio: Set(input.bio.and_then(blank_to_none)),
                    gender: Set(input.gender.and_then(blank_to_none)),
                    location: Set(input.location.and_then(blank_to_none)),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                };
                self.profile_repo.create(model).await?;
            }
        }

        self.get_profile(Some(user_id), user_id).await
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::{EmailService, MemoryMailer};
    use crate::services::token::TokenType;
    use anitrack_common::{
        CacheBackend, MemoryCache, SharedCache,
        config::{JwtConfig, VerificationConfig},
    };
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: Some(format!("{username}@example.com")),
            password_hash: None,
            is_admin: false,
            is_active: true,
            is_banned: false,
            ban_reason: None,
            banned_until: None,
            last_login_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    struct Dbs {
        users: MockDatabase,
        profiles: MockDatabase,
        follows: MockDatabase,
        bans: MockDatabase,
    }

    impl Dbs {
        fn empty() -> Self {
            Self {
                users: MockDatabase::new(DatabaseBackend::Postgres),
                profiles: MockDatabase::new(DatabaseBackend::Postgres),
                follows: MockDatabase::new(DatabaseBackend::Postgres),
                bans: MockDatabase::new(DatabaseBackend::Postgres),
            }
        }
    }

    fn service(dbs: Dbs) -> AccountService {
        service_with_cache(dbs, Arc::new(MemoryCache::new()))
    }

    fn service_with_cache(dbs: Dbs, cache: SharedCache) -> AccountService {
        let user_repo = UserRepository::new(Arc::new(dbs.users.into_connection()));
        let tokens = TokenService::new(
            &JwtConfig {
                secret: "secret".to_string(),
                access_ttl_secs: 60,
                refresh_ttl_secs: 600,
            },
            cache.clone(),
        );
        let verification = VerificationService::new(
            cache,
            UserRepository::new(Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())),
            EmailService::new(Arc::new(MemoryMailer::new()), "Anitrack"),
            VerificationConfig::default(),
        );

        AccountService::new(
            user_repo,
            UserProfileRepository::new(Arc::new(dbs.profiles.into_connection())),
            UserFollowRepository::new(Arc::new(dbs.follows.into_connection())),
            UserBanRepository::new(Arc::new(dbs.bans.into_connection())),
            tokens,
            verification,
        )
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_register_input_validation() {
        let input = RegisterInput {
            username: "ab".to_string(),
            email: "a@example.com".to_string(),
            password: "password123".to_string(),
            code: "123456".to_string(),
        };
        assert!(input.validate().is_err());

        let input = RegisterInput {
            username: "alice_01".to_string(),
            email: "a@example.com".to_string(),
            password: "password123".to_string(),
            code: "123456".to_string(),
        };
        assert!(input.validate().is_ok());
    }

    #[tokio::test]
    async fn test_register_with_taken_username() {
        let mut dbs = Dbs::empty();
        dbs.users = dbs
            .users
            .append_query_results([[create_test_user("u1", "alice")]]);
        let service = service(dbs);

        let result = service
            .register(RegisterInput {
                username: "Alice".to_string(),
                email: "new@example.com".to_string(),
                password: "password123".to_string(),
                code: "123456".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_without_code_fails() {
        let mut dbs = Dbs::empty();
        dbs.users = dbs.users.append_query_results([
            Vec::<user::Model>::new(),
            Vec::<user::Model>::new(),
        ]);
        let service = service(dbs);

        let result = service
            .register(RegisterInput {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "password123".to_string(),
                code: "123456".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let mut user = create_test_user("u1", "alice");
        user.password_hash = Some(hash_password("password123").unwrap());

        let mut dbs = Dbs::empty();
        dbs.users = dbs.users.append_query_results([[user]]);
        let service = service(dbs);

        let result = service
            .login_password(LoginInput {
                login: "alice".to_string(),
                password: "password124".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_success_issues_tokens() {
        let mut user = create_test_user("u1", "alice");
        user.password_hash = Some(hash_password("password123").unwrap());
        let mut updated = user.clone();
        updated.last_login_at = Some(Utc::now().into());

        let mut dbs = Dbs::empty();
        dbs.users = dbs
            .users
            .append_query_results([[user]])
            .append_query_results([[updated]]);
        let service = service(dbs);

        let response = service
            .login_password(LoginInput {
                login: "alice@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.user.id, "u1");
        assert!(!response.tokens.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_change_password_revokes_earlier_tokens() {
        let mut user = create_test_user("u1", "alice");
        user.password_hash = Some(hash_password("password123").unwrap());

        let mut dbs = Dbs::empty();
        dbs.users = dbs
            .users
            .append_query_results([[user.clone()]])
            .append_query_results([[user]]);
        let service = service(dbs);

        let before = service.tokens.issue("u1").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        service
            .change_password(
                "u1",
                ChangePasswordInput {
                    old_password: Some("password123".to_string()),
                    new_password: "password456".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.tokens.refresh(&before.refresh_token).await,
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            service
                .tokens
                .verify(&before.access_token, TokenType::Access)
                .await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_reset_password_revokes_earlier_tokens() {
        let cache: SharedCache = Arc::new(MemoryCache::new());
        let code_hash = hex::encode(<sha2::Sha256 as sha2::Digest>::digest(b"123456"));
        cache
            .set("otp:reset_password:alice@example.com", &code_hash, Some(300))
            .await
            .unwrap();

        let user = create_test_user("u1", "alice");
        let mut dbs = Dbs::empty();
        dbs.users = dbs
            .users
            .append_query_results([[user.clone()]])
            .append_query_results([[user]]);
        let service = service_with_cache(dbs, cache);

        let before = service.tokens.issue("u1").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        service
            .reset_password(ResetPasswordInput {
                email: "Alice@example.com".to_string(),
                code: "123456".to_string(),
                new_password: "password456".to_string(),
            })
            .await
            .unwrap();

        assert!(matches!(
            service.tokens.refresh(&before.refresh_token).await,
            Err(AppError::InvalidToken)
        ));
        let after = service.tokens.issue("u1").unwrap();
        assert!(service.tokens.refresh(&after.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_active_ban() {
        let mut user = create_test_user("u1", "alice");
        user.is_banned = true;
        user.ban_reason = Some("spam".to_string());
        user.banned_until = Some((Utc::now() + Duration::hours(1)).into());

        let mut dbs = Dbs::empty();
        dbs.users = dbs.users.append_query_results([[user]]);
        let service = service(dbs);

        match service.authenticate("u1").await {
            Err(AppError::Banned(reason)) => assert_eq!(reason, "spam"),
            other => panic!("expected ban, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_lifts_expired_ban() {
        let mut user = create_test_user("u1", "alice");
        user.is_banned = true;
        user.ban_reason = Some("spam".to_string());
        user.banned_until = Some((Utc::now() - Duration::hours(1)).into());
        let cleared = create_test_user("u1", "alice");

        let mut dbs = Dbs::empty();
        dbs.users = dbs
            .users
            .append_query_results([[user]])
            .append_query_results([[cleared]]);
        dbs.bans = dbs.bans.append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }]);
        let service = service(dbs);

        let user = service.authenticate("u1").await.unwrap();
        assert!(!user.is_banned);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_deactivated() {
        let mut user = create_test_user("u1", "alice");
        user.is_active = false;

        let mut dbs = Dbs::empty();
        dbs.users = dbs.users.append_query_results([[user]]);
        let service = service(dbs);

        assert!(matches!(
            service.authenticate("u1").await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_get_profile_with_mutual_follow() {
        let user = create_test_user("u2", "bob");
        let profile = user_profile::Model {
            user_id: "u2".to_string(),
            nickname: Some("Bob".to_string()),
            avatar_url: None,
            bio: Some("Hi".to_string()),
            gender: None,
            location: None,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let edge = |id: &str, from: &str, to: &str| anitrack_db::entities::user_follow::Model {
            id: id.to_string(),
            follower_id: from.to_string(),
            following_id: to.to_string(),
            created_at: Utc::now().into(),
        };

        let mut dbs = Dbs::empty();
        dbs.users = dbs.users.append_query_results([[user]]);
        dbs.profiles = dbs.profiles.append_query_results([[profile]]);
        dbs.follows = dbs
            .follows
            .append_query_results([[count_row(3)]])
            .append_query_results([[count_row(5)]])
            .append_query_results([[edge("f1", "u1", "u2")]])
            .append_query_results([[edge("f2", "u2", "u1")]]);
        let service = service(dbs);

        let profile = service.get_profile(Some("u1"), "u2").await.unwrap();
        assert_eq!(profile.nickname.as_deref(), Some("Bob"));
        assert_eq!(profile.followers_count, 3);
        assert_eq!(profile.followings_count, 5);
        assert!(profile.is_following);
        assert!(profile.is_mutual);
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        std::collections::BTreeMap::from([("num_items", sea_orm::Value::BigInt(Some(n)))])
    }

    #[test]
    fn test_blank_to_none() {
        assert_eq!(blank_to_none("  ".to_string()), None);
        assert_eq!(blank_to_none(" Tokyo ".to_string()), Some("Tokyo".to_string()));
    }
}
