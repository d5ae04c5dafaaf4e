//! Anime catalog: curated anime, user-submitted items, episodes and characters.

use anitrack_common::{AppError, AppResult, IdGenerator};
use anitrack_db::{
    entities::{
        activity::{ActivityTarget, ActivityVerb},
        anime, character,
        comment::{self, CommentScope},
        episode, user,
        watch_status::WatchState,
    },
    repositories::{
        AnimeFilter, AnimeRepository, AnimeSort, CharacterRepository, CommentRepository,
        EpisodeRepository, WatchStatusRepository,
    },
};
use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use super::activity::ActivityService;
use super::paging::PageParams;

/// Curated anime or user-submitted item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimeKind {
    #[default]
    Anime,
    Item,
}

impl AnimeKind {
    /// Kind of a stored entry.
    #[must_use]
    pub const fn of(anime: &anime::Model) -> Self {
        if anime.is_admin { Self::Anime } else { Self::Item }
    }

    /// Value of the `is_admin` column for this kind.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Anime)
    }

    /// Comment scope used when rating entries of this kind.
    #[must_use]
    pub const fn comment_scope(self) -> CommentScope {
        match self {
            Self::Anime => CommentScope::Anime,
            Self::Item => CommentScope::Item,
        }
    }
}

/// Input for creating an anime or item.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAnimeInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(max = 256))]
    pub title_original: Option<String>,
    #[validate(length(max = 10000))]
    pub synopsis: Option<String>,
    #[validate(length(max = 2048))]
    pub cover_url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub genres: Vec<String>,
    #[validate(range(min = 0, max = 10000))]
    pub episode_count: Option<i32>,
    pub air_date: Option<NaiveDate>,
    #[validate(range(min = 0, max = 6))]
    pub weekday: Option<i16>,
}

/// Partial update of an anime or item. Empty strings clear optional text.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAnimeInput {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    #[validate(length(max = 256))]
    pub title_original: Option<String>,
    #[validate(length(max = 10000))]
    pub synopsis: Option<String>,
    #[validate(length(max = 2048))]
    pub cover_url: Option<String>,
    #[validate(length(max = 32))]
    pub genres: Option<Vec<String>>,
    #[validate(range(min = 0, max = 10000))]
    pub episode_count: Option<i32>,
    pub air_date: Option<NaiveDate>,
    #[validate(range(min = 0, max = 6))]
    pub weekday: Option<i16>,
}

/// Catalog list query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAnimeQuery {
    pub kind: Option<AnimeKind>,
    pub genre: Option<String>,
    pub season: Option<bool>,
    pub weekly: Option<bool>,
    pub weekday: Option<i16>,
    #[serde(default)]
    pub sort: AnimeSort,
}

/// One page of catalog entries.
#[derive(Debug, Clone, Serialize)]
pub struct AnimePage {
    pub items: Vec<anime::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Anime detail with the caller's own state.
#[derive(Debug, Clone, Serialize)]
pub struct AnimeDetail {
    #[serde(flatten)]
    pub anime: anime::Model,
    pub genres_list: Vec<String>,
    pub episodes: Vec<episode::Model>,
    pub characters: Vec<character::Model>,
    pub my_watch_status: Option<WatchState>,
    pub my_comment: Option<comment::Model>,
}

/// Input for adding an episode.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEpisodeInput {
    #[validate(range(min = 0, max = 10000))]
    pub number: i32,
    #[validate(length(max = 256))]
    pub title: Option<String>,
    pub air_date: Option<NaiveDate>,
}

/// Input for adding a character.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCharacterInput {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

/// Trim, drop empties and de-duplicate genre tags, keeping first occurrence order.
#[must_use]
pub fn normalize_genres(genres: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(genres.len());
    for genre in genres {
        let genre = genre.trim();
        if !genre.is_empty() && !out.iter().any(|g| g == genre) {
            out.push(genre.to_string());
        }
    }
    out
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_admin(actor: &user::Model) -> AppResult<()> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin only".to_string()))
    }
}

/// Whether `actor` may edit or delete `entry`: admins may touch anything,
/// users only their own items.
fn can_manage(actor: &user::Model, entry: &anime::Model) -> bool {
    actor.is_admin || (!entry.is_admin && entry.created_by.as_deref() == Some(actor.id.as_str()))
}

/// Anime catalog service.
#[derive(Clone)]
pub struct AnimeService {
    anime_repo: AnimeRepository,
    episode_repo: EpisodeRepository,
    character_repo: CharacterRepository,
    watch_repo: WatchStatusRepository,
    comment_repo: CommentRepository,
    activity: ActivityService,
    id_gen: IdGenerator,
}

impl AnimeService {
    /// Create a new anime service.
    #[must_use]
    pub const fn new(
        anime_repo: AnimeRepository,
        episode_repo: EpisodeRepository,
        character_repo: CharacterRepository,
        watch_repo: WatchStatusRepository,
        comment_repo: CommentRepository,
        activity: ActivityService,
    ) -> Self {
        Self {
            anime_repo,
            episode_repo,
            character_repo,
            watch_repo,
            comment_repo,
            activity,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a curated anime (admins) or an item (everyone else).
    pub async fn create(&self, actor: &user::Model, input: CreateAnimeInput) -> AppResult<anime::Model> {
        input.validate()?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }

        let now = Utc::now();
        let model = anime::ActiveModel {
            id: Set(self.id_gen.generate()),
            external_id: Set(None),
            title: Set(title),
            title_original: Set(non_blank(input.title_original)),
            synopsis: Set(non_blank(input.synopsis)),
            cover_url: Set(non_blank(input.cover_url)),
            genres: Set(json!(normalize_genres(&input.genres))),
            episode_count: Set(input.episode_count),
            air_date: Set(input.air_date),
            weekday: Set(input.weekday),
            rating: Set(0.0),
            rating_count: Set(0),
            popularity: Set(0),
            is_admin: Set(actor.is_admin),
            created_by: Set(Some(actor.id.clone())),
            is_season: Set(false),
            is_weekly: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };
        let created = self.anime_repo.create(model).await?;

        if !created.is_admin {
            self.activity
                .record(
                    &actor.id,
                    ActivityVerb::ItemCreated,
                    ActivityTarget::Anime,
                    &created.id,
                    json!({ "title": created.title }),
                )
                .await;
        }

        tracing::info!(anime_id = %created.id, is_admin = created.is_admin, "Created catalog entry");
        Ok(created)
    }

    /// Update an entry (owner or admin).
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdateAnimeInput,
    ) -> AppResult<anime::Model> {
        input.validate()?;

        let entry = self.anime_repo.get_by_id(id).await?;
        if !can_manage(actor, &entry) {
            return Err(AppError::Forbidden(
                "You cannot edit this entry".to_string(),
            ));
        }

        let mut active: anime::ActiveModel = entry.into();
        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::Validation("Title cannot be empty".to_string()));
            }
            active.title = Set(title);
        }
        if input.title_original.is_some() {
            active.title_original = Set(non_blank(input.title_original));
        }
        if input.synopsis.is_some() {
            active.synopsis = Set(non_blank(input.synopsis));
        }
        if input.cover_url.is_some() {
            active.cover_url = Set(non_blank(input.cover_url));
        }
        if let Some(genres) = input.genres {
            active.genres = Set(json!(normalize_genres(&genres)));
        }
        if let Some(episode_count) = input.episode_count {
            active.episode_count = Set(Some(episode_count));
        }
        if let Some(air_date) = input.air_date {
            active.air_date = Set(Some(air_date));
        }
        if let Some(weekday) = input.weekday {
            active.weekday = Set(Some(weekday));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.anime_repo.update(active).await
    }

    /// Delete an entry (owner or admin).
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let entry = self.anime_repo.get_by_id(id).await?;
        if !can_manage(actor, &entry) {
            return Err(AppError::Forbidden(
                "You cannot delete this entry".to_string(),
            ));
        }

        self.anime_repo.delete(id).await?;
        tracing::info!(anime_id = %id, actor_id = %actor.id, "Deleted catalog entry");
        Ok(())
    }

    /// List catalog entries.
    pub async fn list(&self, query: ListAnimeQuery, page: PageParams) -> AppResult<AnimePage> {
        if query.weekday.is_some_and(|d| !(0..=6).contains(&d)) {
            return Err(AppError::Validation("weekday must be 0-6".to_string()));
        }

        let filter = AnimeFilter {
            is_admin: query.kind.map(AnimeKind::is_admin),
            genre: non_blank(query.genre),
            is_season: query.season,
            is_weekly: query.weekly,
            weekday: query.weekday,
            created_by: None,
        };

        let items = self
            .anime_repo
            .list(&filter, query.sort, page.limit(), page.offset())
            .await?;
        let total = self.anime_repo.count(&filter).await?;

        Ok(AnimePage {
            items,
            total,
            page: page.page.max(1),
            limit: page.limit(),
        })
    }

    /// Get one entry.
    pub async fn get(&self, id: &str) -> AppResult<anime::Model> {
        self.anime_repo.get_by_id(id).await
    }

    /// Entry detail, with the viewer's watch status and rating when signed in.
    pub async fn detail(&self, viewer_id: Option<&str>, id: &str) -> AppResult<AnimeDetail> {
        let anime = self.anime_repo.get_by_id(id).await?;
        let episodes = self.episode_repo.find_by_anime(id).await?;
        let characters = self.character_repo.find_by_anime(id).await?;

        let (my_watch_status, my_comment) = match viewer_id {
            Some(viewer) => {
                let status = self
                    .watch_repo
                    .find_by_user_anime(viewer, id)
                    .await?
                    .map(|w| w.status);
                let comment = self
                    .comment_repo
                    .find_by_user_target(viewer, AnimeKind::of(&anime).comment_scope(), id)
                    .await?;
                (status, comment)
            }
            None => (None, None),
        };

        Ok(AnimeDetail {
            genres_list: anime.genre_list(),
            anime,
            episodes,
            characters,
            my_watch_status,
            my_comment,
        })
    }

    /// Add an episode (admin only).
    pub async fn create_episode(
        &self,
        actor: &user::Model,
        anime_id: &str,
        input: CreateEpisodeInput,
    ) -> AppResult<episode::Model> {
        require_admin(actor)?;
        input.validate()?;
        self.anime_repo.get_by_id(anime_id).await?;

        if self
            .episode_repo
            .find_by_number(anime_id, input.number)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Episode {} already exists",
                input.number
            )));
        }

        let model = episode::ActiveModel {
            id: Set(self.id_gen.generate()),
            anime_id: Set(anime_id.to_string()),
            number: Set(input.number),
            title: Set(non_blank(input.title)),
            air_date: Set(input.air_date),
            created_at: Set(Utc::now().into()),
        };
        self.episode_repo.create(model).await
    }

    /// Episodes of an anime in order.
    pub async fn list_episodes(&self, anime_id: &str) -> AppResult<Vec<episode::Model>> {
        self.anime_repo.get_by_id(anime_id).await?;
        self.episode_repo.find_by_anime(anime_id).await
    }

    /// Get an episode.
    pub async fn get_episode(&self, id: &str) -> AppResult<episode::Model> {
        self.episode_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Episode {id}")))
    }

    /// Add a character (admin only).
    pub async fn create_character(
        &self,
        actor: &user::Model,
        anime_id: &str,
        input: CreateCharacterInput,
    ) -> AppResult<character::Model> {
        require_admin(actor)?;
        input.validate()?;
        self.anime_repo.get_by_id(anime_id).await?;

        let model = character::ActiveModel {
            id: Set(self.id_gen.generate()),
            anime_id: Set(anime_id.to_string()),
            name: Set(input.name.trim().to_string()),
            description: Set(non_blank(input.description)),
            image_url: Set(non_blank(input.image_url)),
            created_at: Set(Utc::now().into()),
        };
        self.character_repo.create(model).await
    }

    /// Characters of an anime.
    pub async fn list_characters(&self, anime_id: &str) -> AppResult<Vec<character::Model>> {
        self.anime_repo.get_by_id(anime_id).await?;
        self.character_repo.find_by_anime(anime_id).await
    }

    /// Get a character.
    pub async fn get_character(&self, id: &str) -> AppResult<character::Model> {
        self.character_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Character {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::privacy::PrivacyService;
    use anitrack_db::repositories::{
        ActivityRepository, PrivacySettingRepository, UserFollowRepository,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_string(),
            email: None,
            password_hash: None,
            is_admin,
            is_active: true,
            is_banned: false,
            ban_reason: None,
            banned_until: None,
            last_login_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_anime(id: &str, is_admin: bool, created_by: Option<&str>) -> anime::Model {
        anime::Model {
            id: id.to_string(),
            external_id: None,
            title: "Frieren".to_string(),
            title_original: None,
            synopsis: None,
            cover_url: None,
            genres: json!(["Fantasy", "Adventure"]),
            episode_count: Some(28),
            air_date: None,
            weekday: Some(5),
            rating: 9.1,
            rating_count: 10,
            popularity: 100,
            is_admin,
            created_by: created_by.map(str::to_string),
            is_season: false,
            is_weekly: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn mock() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn service(anime_db: MockDatabase, episode_db: MockDatabase) -> AnimeService {
        let follow_repo = UserFollowRepository::new(Arc::new(mock().into_connection()));
        let privacy = PrivacyService::new(
            PrivacySettingRepository::new(Arc::new(mock().into_connection())),
            follow_repo.clone(),
        );
        AnimeService::new(
            AnimeRepository::new(Arc::new(anime_db.into_connection())),
            EpisodeRepository::new(Arc::new(episode_db.into_connection())),
            CharacterRepository::new(Arc::new(mock().into_connection())),
            WatchStatusRepository::new(Arc::new(mock().into_connection())),
            CommentRepository::new(Arc::new(mock().into_connection())),
            ActivityService::new(
                ActivityRepository::new(Arc::new(mock().into_connection())),
                follow_repo,
                privacy,
            ),
        )
    }

    #[test]
    fn test_normalize_genres() {
        let genres = vec![
            " Action ".to_string(),
            String::new(),
            "Action".to_string(),
            "Drama".to_string(),
        ];
        assert_eq!(normalize_genres(&genres), vec!["Action", "Drama"]);
    }

    #[test]
    fn test_can_manage() {
        let admin = create_test_user("admin", true);
        let owner = create_test_user("u1", false);
        let other = create_test_user("u2", false);

        let item = create_test_anime("i1", false, Some("u1"));
        let curated = create_test_anime("a1", true, Some("admin"));

        assert!(can_manage(&admin, &item));
        assert!(can_manage(&admin, &curated));
        assert!(can_manage(&owner, &item));
        assert!(!can_manage(&other, &item));
        assert!(!can_manage(&owner, &curated));
    }

    #[test]
    fn test_kind_mapping() {
        assert!(AnimeKind::Anime.is_admin());
        assert!(!AnimeKind::Item.is_admin());
        assert_eq!(AnimeKind::Item.comment_scope(), CommentScope::Item);
    }

    #[tokio::test]
    async fn test_update_by_non_owner_is_forbidden() {
        let anime_db = mock().append_query_results([[create_test_anime("i1", false, Some("u1"))]]);
        let service = service(anime_db, mock());

        let result = service
            .update(
                &create_test_user("u2", false),
                "i1",
                UpdateAnimeInput {
                    title: Some("Renamed".to_string()),
                    ..UpdateAnimeInput::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_anime() {
        let anime_db = mock().append_query_results([Vec::<anime::Model>::new()]);
        let service = service(anime_db, mock());

        let result = service.delete(&create_test_user("admin", true), "nope").await;
        assert!(matches!(result, Err(AppError::AnimeNotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_creates_curated_anime() {
        let created = create_test_anime("a1", true, Some("admin"));
        let anime_db = mock().append_query_results([[created]]);
        let service = service(anime_db, mock());

        let result = service
            .create(
                &create_test_user("admin", true),
                CreateAnimeInput {
                    title: "Frieren".to_string(),
                    title_original: None,
                    synopsis: None,
                    cover_url: None,
                    genres: vec!["Fantasy".to_string()],
                    episode_count: Some(28),
                    air_date: None,
                    weekday: Some(5),
                },
            )
            .await
            .unwrap();
        assert!(result.is_admin);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_weekday() {
        let service = service(mock(), mock());
        let result = service
            .create(
                &create_test_user("u1", false),
                CreateAnimeInput {
                    title: "Item".to_string(),
                    title_original: None,
                    synopsis: None,
                    cover_url: None,
                    genres: vec![],
                    episode_count: None,
                    air_date: None,
                    weekday: Some(7),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_episode_requires_admin() {
        let service = service(mock(), mock());
        let result = service
            .create_episode(
                &create_test_user("u1", false),
                "a1",
                CreateEpisodeInput {
                    number: 1,
                    title: None,
                    air_date: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_duplicate_episode_number_conflicts() {
        let anime_db = mock().append_query_results([[create_test_anime("a1", true, None)]]);
        let episode_db = mock().append_query_results([[episode::Model {
            id: "e1".to_string(),
            anime_id: "a1".to_string(),
            number: 1,
            title: None,
            air_date: None,
            created_at: Utc::now().into(),
        }]]);
        let service = service(anime_db, episode_db);

        let result = service
            .create_episode(
                &create_test_user("admin", true),
                "a1",
                CreateEpisodeInput {
                    number: 1,
                    title: Some("Again".to_string()),
                    air_date: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_anonymous_detail_has_no_personal_state() {
        let anime_db = mock().append_query_results([[create_test_anime("a1", true, None)]]);
        let episode_db = mock().append_query_results([Vec::<episode::Model>::new()]);
        let follow_repo = UserFollowRepository::new(Arc::new(mock().into_connection()));
        let privacy = PrivacyService::new(
            PrivacySettingRepository::new(Arc::new(mock().into_connection())),
            follow_repo.clone(),
        );
        let service = AnimeService::new(
            AnimeRepository::new(Arc::new(anime_db.into_connection())),
            EpisodeRepository::new(Arc::new(episode_db.into_connection())),
            CharacterRepository::new(Arc::new(
                mock()
                    .append_query_results([Vec::<character::Model>::new()])
                    .into_connection(),
            )),
            WatchStatusRepository::new(Arc::new(mock().into_connection())),
            CommentRepository::new(Arc::new(mock().into_connection())),
            ActivityService::new(
                ActivityRepository::new(Arc::new(mock().into_connection())),
                follow_repo,
                privacy,
            ),
        );

        let detail = service.detail(None, "a1").await.unwrap();
        assert_eq!(detail.genres_list, vec!["Fantasy", "Adventure"]);
        assert!(detail.my_watch_status.is_none());
        assert!(detail.my_comment.is_none());
    }
}
