//! Search across anime, items, users, characters and people.

use std::collections::BTreeSet;

use anitrack_common::{AppError, AppResult};
use anitrack_db::{
    entities::{anime, character, person},
    repositories::{
        AnimeRepository, CharacterRepository, PersonRepository, UserProfileRepository,
        UserRepository,
    },
};
use serde::{Deserialize, Serialize};

use super::account::{UserSummary, summarize_users};

/// Default number of hits per type.
pub const DEFAULT_SEARCH_LIMIT: u64 = 10;
/// Largest number of hits per type.
pub const MAX_SEARCH_LIMIT: u64 = 50;

/// Kind of search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Anime,
    Item,
    User,
    Character,
    Person,
}

impl SearchType {
    /// Every searchable type.
    pub const ALL: [Self; 5] = [
        Self::Anime,
        Self::Item,
        Self::User,
        Self::Character,
        Self::Person,
    ];

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "anime" => Some(Self::Anime),
            "item" | "items" => Some(Self::Item),
            "user" | "users" => Some(Self::User),
            "character" | "characters" => Some(Self::Character),
            "person" | "people" => Some(Self::Person),
            _ => None,
        }
    }
}

/// Search request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    /// Comma separated types; all when absent.
    pub types: Option<String>,
    pub limit: Option<u64>,
}

/// Entry of the merged ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub kind: SearchType,
    pub id: String,
    pub title: String,
    pub relevance: u8,
    #[serde(skip)]
    popularity: i64,
}

/// Grouped search results plus a merged ranking.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub anime: Vec<anime::Model>,
    pub items: Vec<anime::Model>,
    pub users: Vec<UserSummary>,
    pub characters: Vec<character::Model>,
    pub people: Vec<person::Model>,
    pub top: Vec<SearchHit>,
}

/// Parse a comma separated type filter.
pub fn parse_types(raw: Option<&str>) -> AppResult<BTreeSet<SearchType>> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(SearchType::ALL.into_iter().collect());
    };

    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            SearchType::parse(part)
                .ok_or_else(|| AppError::Validation(format!("Unknown search type: {part}")))
        })
        .collect()
}

/// Relevance of `text` to `query`: 3 exact, 2 prefix, 1 substring, 0 otherwise.
/// Both are compared case-insensitively.
#[must_use]
pub fn relevance(query: &str, text: &str) -> u8 {
    let query = query.trim().to_lowercase();
    let text = text.trim().to_lowercase();
    if query.is_empty() {
        0
    } else if text == query {
        3
    } else if text.starts_with(&query) {
        2
    } else if text.contains(&query) {
        1
    } else {
        0
    }
}

fn anime_relevance(query: &str, anime: &anime::Model) -> u8 {
    let original = anime
        .title_original
        .as_deref()
        .map_or(0, |t| relevance(query, t));
    relevance(query, &anime.title).max(original)
}

/// Order hits by relevance, then popularity, then ID.
pub fn rank_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.relevance
            .cmp(&a.relevance)
            .then_with(|| b.popularity.cmp(&a.popularity))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Search service.
#[derive(Clone)]
pub struct SearchService {
    anime_repo: AnimeRepository,
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    character_repo: CharacterRepository,
    person_repo: PersonRepository,
}

impl SearchService {
    /// Create a new search service.
    #[must_use]
    pub const fn new(
        anime_repo: AnimeRepository,
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
        character_repo: CharacterRepository,
        person_repo: PersonRepository,
    ) -> Self {
        Self {
            anime_repo,
            user_repo,
            profile_repo,
            character_repo,
            person_repo,
        }
    }

    /// Run a search.
    pub async fn search(&self, query: SearchQuery) -> AppResult<SearchResults> {
        let q = query.q.trim();
        if q.is_empty() {
            return Err(AppError::BadRequest("Search query is required".to_string()));
        }
        let types = parse_types(query.types.as_deref())?;
        let limit = query
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);

        let mut results = SearchResults::default();
        let mut top = Vec::new();

        if types.contains(&SearchType::Anime) {
            results.anime = self.anime_repo.search(q, true, limit).await?;
            top.extend(results.anime.iter().map(|a| SearchHit {
                kind: SearchType::Anime,
                id: a.id.clone(),
                title: a.title.clone(),
                relevance: anime_relevance(q, a),
                popularity: a.popularity,
            }));
        }

        if types.contains(&SearchType::Item) {
            results.items = self.anime_repo.search(q, false, limit).await?;
            top.extend(results.items.iter().map(|a| SearchHit {
                kind: SearchType::Item,
                id: a.id.clone(),
                title: a.title.clone(),
                relevance: anime_relevance(q, a),
                popularity: a.popularity,
            }));
        }

        if types.contains(&SearchType::User) {
            let ids: Vec<String> = self
                .user_repo
                .search(q, limit)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect();
            results.users = summarize_users(&self.user_repo, &self.profile_repo, &ids).await?;
            top.extend(results.users.iter().map(|u| SearchHit {
                kind: SearchType::User,
                id: u.id.clone(),
                title: u.username.clone(),
                relevance: relevance(q, &u.username),
                popularity: 0,
            }));
        }

        if types.contains(&SearchType::Character) {
            results.characters = self.character_repo.search(q, limit).await?;
            top.extend(results.characters.iter().map(|c| SearchHit {
                kind: SearchType::Character,
                id: c.id.clone(),
                title: c.name.clone(),
                relevance: relevance(q, &c.name),
                popularity: 0,
            }));
        }

        if types.contains(&SearchType::Person) {
            results.people = self.person_repo.search(q, limit).await?;
            top.extend(results.people.iter().map(|p| SearchHit {
                kind: SearchType::Person,
                id: p.id.clone(),
                title: p.name.clone(),
                relevance: relevance(q, &p.name),
                popularity: 0,
            }));
        }

        rank_hits(&mut top);
        top.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        results.top = top;

        tracing::debug!(query = %q, hits = results.top.len(), "Search completed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;
    use std::sync::Arc;

    fn hit(kind: SearchType, id: &str, relevance: u8, popularity: i64) -> SearchHit {
        SearchHit {
            kind,
            id: id.to_string(),
            title: id.to_string(),
            relevance,
            popularity,
        }
    }

    #[test]
    fn test_relevance() {
        assert_eq!(relevance("naruto", "Naruto"), 3);
        assert_eq!(relevance("naru", "Naruto Shippuden"), 2);
        assert_eq!(relevance("shipp", "Naruto Shippuden"), 1);
        assert_eq!(relevance("bleach", "Naruto"), 0);
        assert_eq!(relevance("  ", "Naruto"), 0);
    }

    #[test]
    fn test_rank_hits_uses_popularity_tiebreak() {
        let mut hits = vec![
            hit(SearchType::Character, "c1", 2, 0),
            hit(SearchType::Anime, "a1", 2, 50),
            hit(SearchType::Anime, "a2", 3, 1),
            hit(SearchType::Anime, "a3", 2, 900),
        ];
        rank_hits(&mut hits);

        let order: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(order, vec!["a2", "a3", "a1", "c1"]);
    }

    #[test]
    fn test_parse_types() {
        assert_eq!(parse_types(None).unwrap().len(), 5);
        let types = parse_types(Some("anime,people")).unwrap();
        assert!(types.contains(&SearchType::Anime));
        assert!(types.contains(&SearchType::Person));
        assert!(parse_types(Some("notes")).is_err());
    }

    fn service(anime_db: MockDatabase) -> SearchService {
        let mock = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        SearchService::new(
            AnimeRepository::new(Arc::new(anime_db.into_connection())),
            UserRepository::new(mock()),
            UserProfileRepository::new(mock()),
            CharacterRepository::new(mock()),
            PersonRepository::new(mock()),
        )
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let result = service
            .search(SearchQuery {
                q: "   ".to_string(),
                ..SearchQuery::default()
            })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_anime_only_search() {
        let anime = anime::Model {
            id: "a1".to_string(),
            external_id: None,
            title: "Monster".to_string(),
            title_original: None,
            synopsis: None,
            cover_url: None,
            genres: json!(["Thriller"]),
            episode_count: Some(74),
            air_date: None,
            weekday: None,
            rating: 9.0,
            rating_count: 3,
            popularity: 12,
            is_admin: true,
            created_by: None,
            is_season: false,
            is_weekly: false,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let anime_db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[anime]]);
        let service = service(anime_db);

        let results = service
            .search(SearchQuery {
                q: "monster".to_string(),
                types: Some("anime".to_string()),
                limit: None,
            })
            .await
            .unwrap();

        assert_eq!(results.anime.len(), 1);
        assert!(results.users.is_empty());
        assert_eq!(results.top[0].relevance, 3);
        assert_eq!(results.top[0].kind, SearchType::Anime);
    }
}
