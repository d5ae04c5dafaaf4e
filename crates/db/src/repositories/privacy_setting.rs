//! Privacy setting repository.

use std::sync::Arc;

use crate::entities::{PrivacySetting, privacy_setting};
use anitrack_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait};

/// Privacy setting repository for database operations.
#[derive(Clone)]
pub struct PrivacySettingRepository {
    db: Arc<DatabaseConnection>,
}

impl PrivacySettingRepository {
    /// Create a new privacy setting repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the settings row of a user. `None` means every facet is public.
    pub async fn find_by_user_id(
        &self,
        user_id: &str,
    ) -> AppResult<Option<privacy_setting::Model>> {
        PrivacySetting::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a settings row.
    pub async fn create(
        &self,
        model: privacy_setting::ActiveModel,
    ) -> AppResult<privacy_setting::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a settings row.
    pub async fn update(
        &self,
        model: privacy_setting::ActiveModel,
    ) -> AppResult<privacy_setting::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
