//! Privacy settings and visibility checks.

use anitrack_common::{AppError, AppResult};
use anitrack_db::{
    entities::privacy_setting::{self, Visibility},
    repositories::{PrivacySettingRepository, UserFollowRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Part of a user's data guarded by its own visibility tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyFacet {
    Followings,
    Followers,
    Watchlist,
    Activities,
}

impl PrivacyFacet {
    const fn label(self) -> &'static str {
        match self {
            Self::Followings => "followings",
            Self::Followers => "followers",
            Self::Watchlist => "watchlist",
            Self::Activities => "activities",
        }
    }
}

/// Effective settings of a user. Missing rows read as all public.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacySettings {
    pub followings: Visibility,
    pub followers: Visibility,
    pub watchlist: Visibility,
    pub activities: Visibility,
}

impl PrivacySettings {
    /// Tier of one facet.
    #[must_use]
    pub const fn facet(&self, facet: PrivacyFacet) -> Visibility {
        match facet {
            PrivacyFacet::Followings => self.followings,
            PrivacyFacet::Followers => self.followers,
            PrivacyFacet::Watchlist => self.watchlist,
            PrivacyFacet::Activities => self.activities,
        }
    }
}

impl From<privacy_setting::Model> for PrivacySettings {
    fn from(model: privacy_setting::Model) -> Self {
        Self {
            followings: model.followings,
            followers: model.followers,
            watchlist: model.watchlist,
            activities: model.activities,
        }
    }
}

/// Partial settings update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePrivacyInput {
    pub followings: Option<Visibility>,
    pub followers: Option<Visibility>,
    pub watchlist: Option<Visibility>,
    pub activities: Option<Visibility>,
}

/// Relationship of a viewer to the owner of some data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerRelation {
    pub is_owner: bool,
    /// The owner follows the viewer.
    pub is_friend: bool,
    /// Owner and viewer follow each other.
    pub is_mutual: bool,
}

/// Whether a tier admits a viewer.
#[must_use]
pub const fn visibility_allows(visibility: Visibility, relation: ViewerRelation) -> bool {
    if relation.is_owner {
        return true;
    }
    match visibility {
        Visibility::Public => true,
        Visibility::OnlySelf => false,
        Visibility::Friends => relation.is_friend,
        Visibility::Mutual => relation.is_mutual,
    }
}

/// Service for privacy settings.
#[derive(Clone)]
pub struct PrivacyService {
    privacy_repo: PrivacySettingRepository,
    follow_repo: UserFollowRepository,
}

impl PrivacyService {
    /// Create a new privacy service.
    #[must_use]
    pub const fn new(privacy_repo: PrivacySettingRepository, follow_repo: UserFollowRepository) -> Self {
        Self {
            privacy_repo,
            follow_repo,
        }
    }

    /// Settings of a user, defaults if never saved.
    pub async fn get_settings(&self, user_id: &str) -> AppResult<PrivacySettings> {
        Ok(self
            .privacy_repo
            .find_by_user_id(user_id)
            .await?
            .map(PrivacySettings::from)
            .unwrap_or_default())
    }

    /// Apply a partial update.
    pub async fn update_settings(
        &self,
        user_id: &str,
        input: UpdatePrivacyInput,
    ) -> AppResult<PrivacySettings> {
        let now = Utc::now();

        let saved = match self.privacy_repo.find_by_user_id(user_id).await? {
            Some(existing) => {
                let mut active: privacy_setting::ActiveModel = existing.into();
                if let Some(v) = input.followings {
                    active.followings = Set(v);
                }
                if let Some(v) = input.followers {
                    active.followers = Set(v);
                }
                if let Some(v) = input.watchlist {
                    active.watchlist = Set(v);
                }
                if let Some(v) = input.activities {
                    active.activities = Set(v);
                }
                active.updated_at = Set(now.into());
                self.privacy_repo.update(active).await?
            }
            None => {
                let model = privacy_setting::ActiveModel {
                    user_id: Set(user_id.to_string()),
                    followings: Set(input.followings.unwrap_or_default()),
                    followers: Set(input.followers.unwrap_or_default()),
                    watchlist: Set(input.watchlist.unwrap_or_default()),
                    activities: Set(input.activities.unwrap_or_default()),
                    updated_at: Set(now.into()),
                };
                self.privacy_repo.create(model).await?
            }
        };

        Ok(saved.into())
    }

    async fn relation(&self, owner_id: &str, viewer_id: Option<&str>) -> AppResult<ViewerRelation> {
        let Some(viewer_id) = viewer_id else {
            return Ok(ViewerRelation::default());
        };
        if viewer_id == owner_id {
            return Ok(ViewerRelation {
                is_owner: true,
                ..ViewerRelation::default()
            });
        }

        let is_friend = self.follow_repo.is_following(owner_id, viewer_id).await?;
        let is_mutual = is_friend && self.follow_repo.is_following(viewer_id, owner_id).await?;
        Ok(ViewerRelation {
            is_owner: false,
            is_friend,
            is_mutual,
        })
    }

    /// Whether a viewer may see a facet of the owner's data.
    pub async fn can_view(
        &self,
        owner_id: &str,
        viewer_id: Option<&str>,
        facet: PrivacyFacet,
    ) -> AppResult<bool> {
        if viewer_id == Some(owner_id) {
            return Ok(true);
        }

        let visibility = self.get_settings(owner_id).await?.facet(facet);
        match visibility {
            Visibility::Public => Ok(true),
            Visibility::OnlySelf => Ok(false),
            _ => Ok(visibility_allows(
                visibility,
                self.relation(owner_id, viewer_id).await?,
            )),
        }
    }

    /// Like [`Self::can_view`] but fails with `Forbidden`.
    pub async fn ensure_can_view(
        &self,
        owner_id: &str,
        viewer_id: Option<&str>,
        facet: PrivacyFacet,
    ) -> AppResult<()> {
        if self.can_view(owner_id, viewer_id, facet).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "This user's {} are not visible to you",
                facet.label()
            )))
        }
    }
}
