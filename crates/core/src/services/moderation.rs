//! Moderation service for user bans.

use anitrack_common::{AppError, AppResult, IdGenerator};
use anitrack_db::{
    entities::{user, user_ban},
    repositories::{UserBanRepository, UserRepository},
};
use chrono::{Duration, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::paging::PageParams;

/// Input for banning a user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BanUserInput {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    /// Duration in seconds, None for permanent.
    #[validate(range(min = 1))]
    pub duration_secs: Option<i64>,
}

/// One page of banned users.
#[derive(Debug, Clone, Serialize)]
pub struct BannedUsersPage {
    pub items: Vec<user::Model>,
    pub total: u64,
}

/// Moderation service for bans.
#[derive(Clone)]
pub struct ModerationService {
    user_repo: UserRepository,
    ban_repo: UserBanRepository,
    id_gen: IdGenerator,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, ban_repo: UserBanRepository) -> Self {
        Self {
            user_repo,
            ban_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Ban a user, permanently or for `duration_secs`.
    pub async fn ban(
        &self,
        admin: &user::Model,
        user_id: &str,
        input: BanUserInput,
    ) -> AppResult<user_ban::Model> {
        input.validate()?;

        // Can't ban yourself
        if admin.id == user_id {
            return Err(AppError::BadRequest("Cannot ban yourself".to_string()));
        }

        let target = self.user_repo.get_by_id(user_id).await?;
        if target.is_admin {
            return Err(AppError::Forbidden("Cannot ban an admin".to_string()));
        }

        let now = Utc::now();
        if target.is_ban_active(now.into()) {
            return Err(AppError::Conflict("User is already banned".to_string()));
        }

        let reason = input.reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppError::Validation("Ban reason is required".to_string()));
        }

        let expires_at = input.duration_secs.map(|secs| now + Duration::seconds(secs));

        // Close out a lapsed ban before opening a new one
        self.ban_repo.lift_all(user_id, None).await?;

        let ban = self
            .ban_repo
            .create(user_ban::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id.to_string()),
                admin_id: Set(admin.id.clone()),
                reason: Set(reason.clone()),
                created_at: Set(now.into()),
                expires_at: Set(expires_at.map(Into::into)),
                lifted_at: Set(None),
                lifted_by: Set(None),
            })
            .await?;

        let mut active: user::ActiveModel = target.into();
        active.is_banned = Set(true);
        active.ban_reason = Set(Some(reason));
        active.banned_until = Set(expires_at.map(Into::into));
        active.updated_at = Set(Some(now.into()));
        self.user_repo.update(active).await?;

        tracing::info!(
            user_id = %user_id,
            admin_id = %admin.id,
            expires_at = ?expires_at,
            "User banned"
        );
        Ok(ban)
    }

    /// Lift a ban early.
    pub async fn unban(&self, admin: &user::Model, user_id: &str) -> AppResult<user::Model> {
        let target = self.user_repo.get_by_id(user_id).await?;
        if !target.is_banned {
            return Err(AppError::BadRequest("User is not banned".to_string()));
        }

        self.ban_repo.lift_all(user_id, Some(&admin.id)).await?;
        let user = self.user_repo.clear_ban(target).await?;

        tracing::info!(user_id = %user_id, admin_id = %admin.id, "User unbanned");
        Ok(user)
    }

    /// Currently banned users.
    pub async fn banned_users(&self, page: PageParams) -> AppResult<BannedUsersPage> {
        let items = self
            .user_repo
            .find_banned(page.limit(), page.offset())
            .await?;
        let total = self.user_repo.count_banned().await?;
        Ok(BannedUsersPage { items, total })
    }

    /// Ban history of a user, newest first.
    pub async fn ban_history(&self, user_id: &str, page: PageParams) -> AppResult<Vec<user_ban::Model>> {
        self.user_repo.get_by_id(user_id).await?;
        self.ban_repo
            .find_by_user(user_id, page.limit(), page.offset())
            .await
    }
}
