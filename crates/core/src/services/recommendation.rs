//! Personalised anime recommendations.
//!
//! Three signals are blended:
//!
//! - **interest**: genre weights from the user's own comments and watch
//!   statuses, matched against candidate anime,
//! - **friend**: how many followed users have a status on an anime,
//! - **popularity**: a blend of popularity and rating over the top entries.
//!
//! Each signal is scaled by its weight; the merged list is divided by the
//! total weight of the signals that produced anything, so a user with no
//! friends is ranked on interest and popularity alone.
//!
//! Users to follow are suggested separately, ranked by shared watch statuses.

use std::collections::{BTreeSet, HashMap, HashSet};

use anitrack_common::{
    AppError, AppResult, SharedCache,
    cache::{get_json, set_json},
};
use anitrack_db::{
    entities::{anime, watch_status::WatchState},
    repositories::{
        AnimeRepository, CommentRepository, SharedWatchUser, UserFollowRepository,
        UserRepository, WatchStatusRepository,
    },
};
use serde::{Deserialize, Serialize};

use super::anime::AnimeKind;
use super::paging::PageParams;

/// Weight of the interest signal.
pub const ALPHA: f64 = 0.5;
/// Weight of the friend signal.
pub const BETA: f64 = 0.3;
/// Weight of the popularity signal.
pub const GAMMA: f64 = 0.2;

/// Genre weight contributed by each anime-level comment.
const COMMENT_GENRE_WEIGHT: f64 = 5.0;
/// How many top entries the popularity signal considers.
const POPULAR_POOL: u64 = 50;

/// A recommendation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Interest,
    Friend,
    Popularity,
}

impl RecommendationSource {
    /// All signals, in blending order.
    pub const ALL: [Self; 3] = [Self::Interest, Self::Friend, Self::Popularity];

    /// Blending weight of the signal.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Interest => ALPHA,
            Self::Friend => BETA,
            Self::Popularity => GAMMA,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Interest => "interest",
            Self::Friend => "friend",
            Self::Popularity => "popularity",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "interest" => Some(Self::Interest),
            "friend" | "friends" => Some(Self::Friend),
            "popularity" | "hot" => Some(Self::Popularity),
            _ => None,
        }
    }
}

/// Parse a comma separated source filter. Empty means every source.
pub fn parse_sources(raw: Option<&str>) -> AppResult<BTreeSet<RecommendationSource>> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(RecommendationSource::ALL.into_iter().collect());
    };

    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            RecommendationSource::parse(part)
                .ok_or_else(|| AppError::Validation(format!("Unknown recommendation source: {part}")))
        })
        .collect()
}

/// Genre weight of a watch state.
#[must_use]
pub const fn watch_state_weight(state: WatchState) -> f64 {
    match state {
        WatchState::Want => 4.0,
        WatchState::Watching => 7.0,
        WatchState::Finished => 8.0,
    }
}

/// Accumulate genre weights from commented and watched anime.
#[must_use]
pub fn genre_weights(
    commented: &[&anime::Model],
    watched: &[(WatchState, &anime::Model)],
) -> HashMap<String, f64> {
    let mut weights: HashMap<String, f64> = HashMap::new();
    for anime in commented {
        for genre in anime.genre_list() {
            *weights.entry(genre).or_default() += COMMENT_GENRE_WEIGHT;
        }
    }
    for (state, anime) in watched {
        for genre in anime.genre_list() {
            *weights.entry(genre).or_default() += watch_state_weight(*state);
        }
    }
    weights
}

/// Raw score of one anime under one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub anime_id: String,
    pub score: f64,
}

/// Interest scores: sum of known genre weights, scaled by [`ALPHA`].
/// Candidates sharing no weighted genre are dropped.
#[must_use]
pub fn interest_scores(weights: &HashMap<String, f64>, candidates: &[anime::Model]) -> Vec<Scored> {
    candidates
        .iter()
        .filter_map(|anime| {
            let raw: f64 = anime
                .genre_list()
                .iter()
                .filter_map(|g| weights.get(g))
                .sum();
            (raw > 0.0).then(|| Scored {
                anime_id: anime.id.clone(),
                score: raw * ALPHA,
            })
        })
        .collect()
}

/// Friend scores from `(friend_id, anime_id)` pairs: distinct friends per
/// anime, scaled by [`BETA`]. Anime in `exclude` are skipped.
#[must_use]
pub fn friend_scores(pairs: &[(String, String)], exclude: &HashSet<String>) -> Vec<Scored> {
    let mut watchers: HashMap<&str, HashSet<&str>> = HashMap::new();
    for (friend, anime_id) in pairs {
        if !exclude.contains(anime_id) {
            watchers.entry(anime_id.as_str()).or_default().insert(friend.as_str());
        }
    }

    watchers
        .into_iter()
        .map(|(anime_id, friends)| Scored {
            anime_id: anime_id.to_string(),
            score: friends.len() as f64 * BETA,
        })
        .collect()
}

/// Unweighted popularity blend: `0.7 * popularity / 1000 + 0.3 * rating / 10`.
#[must_use]
pub fn popularity_blend(anime: &anime::Model) -> f64 {
    0.7 * (anime.popularity as f64 / 1000.0) + 0.3 * (anime.rating / 10.0)
}

/// Popularity scores, scaled by [`GAMMA`].
#[must_use]
pub fn popularity_scores(anime: &[anime::Model]) -> Vec<Scored> {
    anime
        .iter()
        .map(|a| Scored {
            anime_id: a.id.clone(),
            score: popularity_blend(a) * GAMMA,
        })
        .collect()
}

/// Merged score of one anime.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub anime_id: String,
    pub score: f64,
    pub reasons: Vec<RecommendationSource>,
}

/// Blend per-signal lists into one ranking.
///
/// Scores are divided by the summed weight of the signals with non-empty
/// lists, duplicates are summed, and ties break on anime ID.
#[must_use]
pub fn blend(signals: Vec<(RecommendationSource, Vec<Scored>)>) -> Vec<Ranked> {
    let total_weight: f64 = signals
        .iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(source, _)| source.weight())
        .sum();
    if total_weight <= 0.0 {
        return vec![];
    }

    let mut merged: HashMap<String, Ranked> = HashMap::new();
    for (source, list) in signals {
        for scored in list {
            let entry = merged
                .entry(scored.anime_id.clone())
                .or_insert_with(|| Ranked {
                    anime_id: scored.anime_id,
                    score: 0.0,
                    reasons: vec![],
                });
            entry.score += scored.score / total_weight;
            if !entry.reasons.contains(&source) {
                entry.reasons.push(source);
            }
        }
    }

    let mut ranked: Vec<Ranked> = merged.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.anime_id.cmp(&b.anime_id))
    });
    ranked
}

/// Recommendation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    pub kind: AnimeKind,
    /// Comma separated sources, e.g. `interest,friend`.
    pub sources: Option<String>,
}

/// One recommended anime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub anime_id: String,
    pub title: String,
    pub cover_url: Option<String>,
    pub rating: f64,
    pub score: f64,
    pub reasons: Vec<RecommendationSource>,
}

/// One page of recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationPage {
    pub count: usize,
    pub page: u64,
    pub limit: u64,
    pub results: Vec<Recommendation>,
}

/// One page of suggested users.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecommendationPage {
    pub count: u64,
    pub page: u64,
    pub limit: u64,
    pub results: Vec<SharedWatchUser>,
}

/// Cache key of a recommendation page.
#[must_use]
pub fn cache_key(
    user_id: Option<&str>,
    kind: AnimeKind,
    sources: &BTreeSet<RecommendationSource>,
    page: &PageParams,
) -> String {
    let sources: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    format!(
        "recommend:{}:{}:{}:{}:{}",
        user_id.unwrap_or("anon"),
        if kind.is_admin() { "anime" } else { "item" },
        sources.join(","),
        page.page.max(1),
        page.limit()
    )
}

/// Recommendation service.
#[derive(Clone)]
pub struct RecommendationService {
    anime_repo: AnimeRepository,
    comment_repo: CommentRepository,
    watch_repo: WatchStatusRepository,
    follow_repo: UserFollowRepository,
    user_repo: UserRepository,
    cache: SharedCache,
    cache_ttl_secs: i64,
}

impl RecommendationService {
    /// Create a new recommendation service.
    #[must_use]
    pub fn new(
        anime_repo: AnimeRepository,
        comment_repo: CommentRepository,
        watch_repo: WatchStatusRepository,
        follow_repo: UserFollowRepository,
        user_repo: UserRepository,
        cache: SharedCache,
        cache_ttl_secs: i64,
    ) -> Self {
        Self {
            anime_repo,
            comment_repo,
            watch_repo,
            follow_repo,
            user_repo,
            cache,
            cache_ttl_secs,
        }
    }

    /// Recommendations for a user, or popularity only for anonymous callers.
    pub async fn recommend(
        &self,
        user_id: Option<&str>,
        query: RecommendationQuery,
        page: PageParams,
    ) -> AppResult<RecommendationPage> {
        let mut sources = parse_sources(query.sources.as_deref())?;
        if user_id.is_none() {
            sources = BTreeSet::from([RecommendationSource::Popularity]);
        }
        let page = PageParams::new(page.page, page.limit);

        let key = cache_key(user_id, query.kind, &sources, &page);
        match get_json::<RecommendationPage>(self.cache.as_ref(), &key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, key = %key, "Failed to read recommendation cache"),
        }

        let mut catalog: HashMap<String, anime::Model> = HashMap::new();
        let mut signals = Vec::with_capacity(sources.len());

        for source in &sources {
            let result = match (source, user_id) {
                (RecommendationSource::Interest, Some(user)) => {
                    self.interest_signal(user, query.kind, &mut catalog).await
                }
                (RecommendationSource::Friend, Some(user)) => {
                    self.friend_signal(user, query.kind, &mut catalog).await
                }
                (RecommendationSource::Popularity, _) => {
                    self.popularity_signal(query.kind, &mut catalog).await
                }
                (_, None) => Ok(vec![]),
            };

            match result {
                Ok(list) => signals.push((*source, list)),
                Err(e) => {
                    tracing::warn!(error = %e, source = ?source, "Recommendation signal failed");
                    signals.push((*source, vec![]));
                }
            }
        }

        let ranked = blend(signals);
        let count = ranked.len();
        let results = ranked
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .filter_map(|r| {
                let anime = catalog.get(&r.anime_id)?;
                Some(Recommendation {
                    title: anime.title.clone(),
                    cover_url: anime.cover_url.clone(),
                    rating: anime.rating,
                    anime_id: r.anime_id,
                    score: r.score,
                    reasons: r.reasons,
                })
            })
            .collect();

        let response = RecommendationPage {
            count,
            page: page.page,
            limit: page.limit(),
            results,
        };

        if let Err(e) = set_json(self.cache.as_ref(), &key, &response, self.cache_ttl_secs).await {
            tracing::warn!(error = %e, key = %key, "Failed to cache recommendations");
        }

        Ok(response)
    }

    /// Users the caller does not follow yet, most shared anime first.
    pub async fn recommend_users(
        &self,
        user_id: &str,
        page: PageParams,
    ) -> AppResult<UserRecommendationPage> {
        let page = PageParams::new(page.page, page.limit);

        let results = self
            .user_repo
            .find_by_shared_watch(user_id, page.limit(), page.offset())
            .await?;
        let count = self.user_repo.count_suggestable(user_id).await?;

        Ok(UserRecommendationPage {
            count,
            page: page.page,
            limit: page.limit(),
            results,
        })
    }

    async fn interest_signal(
        &self,
        user_id: &str,
        kind: AnimeKind,
        catalog: &mut HashMap<String, anime::Model>,
    ) -> AppResult<Vec<Scored>> {
        let comments = self.comment_repo.find_anime_comments_by_user(user_id).await?;
        let statuses = self.watch_repo.find_all_by_user(user_id).await?;
        if comments.is_empty() && statuses.is_empty() {
            return Ok(vec![]);
        }

        let mut seen: Vec<String> = comments
            .iter()
            .map(|c| c.target_id.clone())
            .chain(statuses.iter().map(|s| s.anime_id.clone()))
            .collect();
        seen.sort();
        seen.dedup();

        let known: HashMap<String, anime::Model> = self
            .anime_repo
            .find_by_ids(&seen)
            .await?
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();

        let commented: Vec<&anime::Model> = comments
            .iter()
            .filter_map(|c| known.get(&c.target_id))
            .collect();
        let watched: Vec<(WatchState, &anime::Model)> = statuses
            .iter()
            .filter_map(|s| known.get(&s.anime_id).map(|a| (s.status, a)))
            .collect();

        let weights = genre_weights(&commented, &watched);
        if weights.is_empty() {
            return Ok(vec![]);
        }

        let mut genres: Vec<String> = weights.keys().cloned().collect();
        genres.sort();
        let candidates = self
            .anime_repo
            .find_by_any_genre(kind.is_admin(), &genres, &seen)
            .await?;
        let scored = interest_scores(&weights, &candidates);
        for anime in candidates {
            catalog.entry(anime.id.clone()).or_insert(anime);
        }
        Ok(scored)
    }

    async fn friend_signal(
        &self,
        user_id: &str,
        kind: AnimeKind,
        catalog: &mut HashMap<String, anime::Model>,
    ) -> AppResult<Vec<Scored>> {
        let friends = self.follow_repo.following_ids(user_id).await?;
        if friends.is_empty() {
            return Ok(vec![]);
        }

        let statuses = self.watch_repo.find_by_users(&friends).await?;
        let own: HashSet<String> = self
            .watch_repo
            .find_all_by_user(user_id)
            .await?
            .into_iter()
            .map(|s| s.anime_id)
            .collect();

        let mut anime_ids: Vec<String> = statuses.iter().map(|s| s.anime_id.clone()).collect();
        anime_ids.sort();
        anime_ids.dedup();
        let anime = self.anime_repo.find_by_ids(&anime_ids).await?;

        let of_kind: HashSet<&str> = anime
            .iter()
            .filter(|a| a.is_admin == kind.is_admin())
            .map(|a| a.id.as_str())
            .collect();
        let pairs: Vec<(String, String)> = statuses
            .iter()
            .filter(|s| of_kind.contains(s.anime_id.as_str()))
            .map(|s| (s.user_id.clone(), s.anime_id.clone()))
            .collect();

        let scored = friend_scores(&pairs, &own);
        for a in anime {
            catalog.entry(a.id.clone()).or_insert(a);
        }
        Ok(scored)
    }

    async fn popularity_signal(
        &self,
        kind: AnimeKind,
        catalog: &mut HashMap<String, anime::Model>,
    ) -> AppResult<Vec<Scored>> {
        let top = self
            .anime_repo
            .find_top_blended(kind.is_admin(), POPULAR_POOL)
            .await?;
        let scored = popularity_scores(&top);
        for a in top {
            catalog.entry(a.id.clone()).or_insert(a);
        }
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anitrack_common::MemoryCache;
    use anitrack_db::entities::{comment, watch_status};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, Value};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn create_test_anime(id: &str, genres: &[&str], popularity: i64, rating: f64) -> anime::Model {
        anime::Model {
            id: id.to_string(),
            external_id: None,
            title: id.to_uppercase(),
            title_original: None,
            synopsis: None,
            cover_url: None,
            genres: json!(genres),
            episode_count: None,
            air_date: None,
            weekday: None,
            rating,
            rating_count: 1,
            popularity,
            is_admin: true,
            created_by: None,
            is_season: false,
            is_weekly: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn scored(id: &str, score: f64) -> Scored {
        Scored {
            anime_id: id.to_string(),
            score,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!(parse_sources(None).unwrap().len(), 3);
        assert_eq!(parse_sources(Some("  ")).unwrap().len(), 3);

        let parsed = parse_sources(Some("friend, hot")).unwrap();
        assert!(parsed.contains(&RecommendationSource::Friend));
        assert!(parsed.contains(&RecommendationSource::Popularity));
        assert!(!parsed.contains(&RecommendationSource::Interest));

        assert!(parse_sources(Some("interest,bogus")).is_err());
    }

    #[test]
    fn test_genre_weights() {
        let action = create_test_anime("a1", &["action", "drama"], 0, 0.0);
        let drama = create_test_anime("a2", &["drama"], 0, 0.0);

        let weights = genre_weights(&[&action], &[(WatchState::Finished, &drama)]);
        assert!(approx(weights["action"], 5.0));
        assert!(approx(weights["drama"], 13.0));
    }

    #[test]
    fn test_interest_scores_skip_unrelated() {
        let weights = HashMap::from([("drama".to_string(), 8.0), ("action".to_string(), 4.0)]);
        let candidates = vec![
            create_test_anime("c1", &["drama", "action"], 0, 0.0),
            create_test_anime("c2", &["comedy"], 0, 0.0),
        ];

        let scores = interest_scores(&weights, &candidates);
        assert_eq!(scores.len(), 1);
        assert!(approx(scores[0].score, 12.0 * ALPHA));
    }

    #[test]
    fn test_friend_scores_count_distinct_friends() {
        let pairs = vec![
            ("f1".to_string(), "a1".to_string()),
            ("f2".to_string(), "a1".to_string()),
            ("f1".to_string(), "a1".to_string()),
            ("f1".to_string(), "mine".to_string()),
        ];
        let exclude = HashSet::from(["mine".to_string()]);

        let scores = friend_scores(&pairs, &exclude);
        assert_eq!(scores.len(), 1);
        assert!(approx(scores[0].score, 2.0 * BETA));
    }

    #[test]
    fn test_popularity_blend() {
        let anime = create_test_anime("a1", &[], 500, 8.0);
        assert!(approx(popularity_blend(&anime), 0.7 * 0.5 + 0.3 * 0.8));
    }

    #[test]
    fn test_blend_renormalizes_over_active_sources() {
        let ranked = blend(vec![
            (RecommendationSource::Interest, vec![scored("a", 1.0)]),
            (RecommendationSource::Friend, vec![]),
            (RecommendationSource::Popularity, vec![scored("a", 0.4), scored("b", 0.6)]),
        ]);

        let total = ALPHA + GAMMA;
        assert_eq!(ranked[0].anime_id, "a");
        assert!(approx(ranked[0].score, 1.4 / total));
        assert_eq!(
            ranked[0].reasons,
            vec![RecommendationSource::Interest, RecommendationSource::Popularity]
        );
        assert!(approx(ranked[1].score, 0.6 / total));
    }

    #[test]
    fn test_blend_breaks_ties_by_id() {
        let ranked = blend(vec![(
            RecommendationSource::Popularity,
            vec![scored("b", 0.5), scored("a", 0.5)],
        )]);
        assert_eq!(ranked[0].anime_id, "a");
        assert_eq!(ranked[1].anime_id, "b");
    }

    #[test]
    fn test_blend_with_nothing() {
        assert!(blend(vec![(RecommendationSource::Friend, vec![])]).is_empty());
    }

    #[test]
    fn test_cache_key() {
        let sources = parse_sources(Some("popularity,interest")).unwrap();
        let key = cache_key(None, AnimeKind::Item, &sources, &PageParams::new(2, 10));
        assert_eq!(key, "recommend:anon:item:interest,popularity:2:10");
    }

    fn mock() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn service_with(
        anime_db: MockDatabase,
        comment_db: MockDatabase,
        watch_db: MockDatabase,
        user_db: MockDatabase,
    ) -> RecommendationService {
        RecommendationService::new(
            AnimeRepository::new(Arc::new(anime_db.into_connection())),
            CommentRepository::new(Arc::new(comment_db.into_connection())),
            WatchStatusRepository::new(Arc::new(watch_db.into_connection())),
            UserFollowRepository::new(Arc::new(mock().into_connection())),
            UserRepository::new(Arc::new(user_db.into_connection())),
            Arc::new(MemoryCache::new()),
            1800,
        )
    }

    fn service(anime_db: MockDatabase) -> RecommendationService {
        service_with(anime_db, mock(), mock(), mock())
    }

    fn create_test_status(anime_id: &str, status: WatchState) -> watch_status::Model {
        watch_status::Model {
            id: format!("w-{anime_id}"),
            user_id: "u1".to_string(),
            anime_id: anime_id.to_string(),
            status,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn shared_row(id: &str, count: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("id", Value::from(id)),
            ("username", Value::from(id.to_uppercase())),
            ("avatar_url", Value::String(None)),
            ("mutual_watch_count", Value::from(count)),
        ])
    }

    #[tokio::test]
    async fn test_interest_reaches_unpopular_genre_match() {
        let seen = create_test_anime("seen", &["drama"], 900, 9.0);
        // Least popular entry in the catalog; only the genre overlap finds it
        let obscure = create_test_anime("obscure", &["drama", "slice of life"], 0, 0.0);

        let anime_db = mock()
            .append_query_results([[seen]])
            .append_query_results([[obscure]]);
        let comment_db = mock().append_query_results([Vec::<comment::Model>::new()]);
        let watch_db =
            mock().append_query_results([[create_test_status("seen", WatchState::Finished)]]);
        let service = service_with(anime_db, comment_db, watch_db, mock());

        let page = service
            .recommend(
                Some("u1"),
                RecommendationQuery {
                    sources: Some("interest".to_string()),
                    ..RecommendationQuery::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].anime_id, "obscure");
        assert_eq!(page.results[0].reasons, vec![RecommendationSource::Interest]);
        assert!(approx(page.results[0].score, 8.0));
    }

    #[tokio::test]
    async fn test_recommend_users_ranked_by_shared_anime() {
        let user_db = mock()
            .append_query_results([vec![
                shared_row("carol", 2),
                shared_row("bob", 1),
                shared_row("dave", 0),
            ]])
            .append_query_results([vec![BTreeMap::from([("count", Value::from(3_i64))])]]);
        let service = service_with(mock(), mock(), mock(), user_db);

        let page = service
            .recommend_users("alice", PageParams::new(1, 5))
            .await
            .unwrap();

        assert_eq!(page.count, 3);
        assert_eq!(page.limit, 5);
        let counts: Vec<i64> = page.results.iter().map(|u| u.mutual_watch_count).collect();
        assert_eq!(counts, vec![2, 1, 0]);
        assert!(page.results.iter().all(|u| u.id != "alice"));
    }

    #[tokio::test]
    async fn test_recommend_users_when_everyone_is_followed() {
        let user_db = mock()
            .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()])
            .append_query_results([vec![BTreeMap::from([("count", Value::from(0_i64))])]]);
        let service = service_with(mock(), mock(), mock(), user_db);

        let page = service
            .recommend_users("lonely", PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_gets_popularity_only() {
        let anime_db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
            create_test_anime("a1", &["drama"], 900, 9.0),
            create_test_anime("a2", &["comedy"], 100, 6.0),
        ]]);
        let service = service(anime_db);

        let page = service
            .recommend(
                None,
                RecommendationQuery {
                    sources: Some("interest".to_string()),
                    ..RecommendationQuery::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.count, 2);
        assert_eq!(page.results[0].anime_id, "a1");
        assert_eq!(page.results[0].reasons, vec![RecommendationSource::Popularity]);
    }

    #[tokio::test]
    async fn test_failed_signal_yields_empty_page() {
        let anime_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("boom".to_string())]);
        let service = service(anime_db);

        let page = service
            .recommend(None, RecommendationQuery::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
    }
}
