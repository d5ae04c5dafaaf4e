//! Watch status service.

use anitrack_common::{AppResult, IdGenerator};
use anitrack_db::{
    entities::{
        activity::{ActivityTarget, ActivityVerb},
        anime,
        watch_status::{self, WatchState},
    },
    repositories::{AnimeRepository, UserRepository, WatchStatusRepository},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::activity::ActivityService;
use super::paging::PageParams;
use super::privacy::{PrivacyFacet, PrivacyService};

/// Body of a set-status request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SetWatchStatusInput {
    pub status: WatchState,
}

/// Watchlist filter.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WatchlistQuery {
    pub status: Option<WatchState>,
}

/// Watchlist row with its anime.
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistEntry {
    #[serde(flatten)]
    pub status: watch_status::Model,
    pub anime: Option<anime::Model>,
}

/// One page of a watchlist.
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistPage {
    pub items: Vec<WatchlistEntry>,
    pub total: u64,
}

/// Watch status service for business logic.
#[derive(Clone)]
pub struct WatchStatusService {
    watch_repo: WatchStatusRepository,
    anime_repo: AnimeRepository,
    user_repo: UserRepository,
    privacy: PrivacyService,
    activity: ActivityService,
    id_gen: IdGenerator,
}

impl WatchStatusService {
    /// Create a new watch status service.
    #[must_use]
    pub const fn new(
        watch_repo: WatchStatusRepository,
        anime_repo: AnimeRepository,
        user_repo: UserRepository,
        privacy: PrivacyService,
        activity: ActivityService,
    ) -> Self {
        Self {
            watch_repo,
            anime_repo,
            user_repo,
            privacy,
            activity,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the caller's status on an anime. A first status bumps popularity.
    pub async fn set(
        &self,
        user_id: &str,
        anime_id: &str,
        status: WatchState,
    ) -> AppResult<watch_status::Model> {
        let anime = self.anime_repo.get_by_id(anime_id).await?;

        if let Some(existing) = self
            .watch_repo
            .find_by_user_anime(user_id, anime_id)
            .await?
            .filter(|existing| existing.status == status)
        {
            return Ok(existing);
        }

        let saved = self
            .watch_repo
            .set_status(user_id, anime_id, status, self.id_gen.generate())
            .await?;
        if saved.created {
            tracing::debug!(user_id = %user_id, anime_id = %anime_id, "First watch status");
        }

        self.activity
            .record(
                user_id,
                ActivityVerb::WatchStatusChanged,
                ActivityTarget::Anime,
                anime_id,
                json!({ "title": anime.title, "status": status }),
            )
            .await;

        Ok(saved.model)
    }

    /// Remove the caller's status. Returns false when there was none.
    pub async fn remove(&self, user_id: &str, anime_id: &str) -> AppResult<bool> {
        self.watch_repo.remove(user_id, anime_id).await
    }

    /// Watchlist of `owner_id`, subject to the watchlist facet.
    pub async fn list(
        &self,
        viewer_id: Option<&str>,
        owner_id: &str,
        query: WatchlistQuery,
        page: PageParams,
    ) -> AppResult<WatchlistPage> {
        self.user_repo.get_by_id(owner_id).await?;
        self.privacy
            .ensure_can_view(owner_id, viewer_id, PrivacyFacet::Watchlist)
            .await?;

        let statuses = self
            .watch_repo
            .find_by_user(owner_id, query.status, page.limit(), page.offset())
            .await?;
        let total = self.watch_repo.count_by_user(owner_id, query.status).await?;

        let anime_ids: Vec<String> = statuses.iter().map(|s| s.anime_id.clone()).collect();
        let anime = self.anime_repo.find_by_ids(&anime_ids).await?;

        let items = statuses
            .into_iter()
            .map(|status| WatchlistEntry {
                anime: anime.iter().find(|a| a.id == status.anime_id).cloned(),
                status,
            })
            .collect();

        Ok(WatchlistPage { items, total })
    }
}
