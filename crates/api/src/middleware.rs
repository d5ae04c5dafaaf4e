//! API middleware and shared state.

#![allow(missing_docs)]

use std::sync::Arc;

use anitrack_common::{AppResult, Config, SharedCache};
use anitrack_core::{
    AccountService, ActivityService, AnimeService, CommentService, EmailService,
    FollowingService, LikeService, Mailer, ModerationService, PersonService, PrivacyService,
    RecommendationService, ReplyService, ReportService, SearchService, SyncService, TokenService,
    TokenType, VerificationService, WatchStatusService,
};
use anitrack_db::repositories::{
    ActivityRepository, AnimeRepository, CharacterRepository, CommentRepository,
    EpisodeRepository, LikeRepository, PersonRepository, PrivacySettingRepository,
    ReplyRepository, ReportRepository, SyncLogRepository, UserBanRepository,
    UserFollowRepository, UserProfileRepository, UserRepository, WatchStatusRepository,
};
use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;

use crate::{extractors::TrustedProxies, rate_limit::ApiRateLimiter};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub account_service: AccountService,
    pub token_service: TokenService,
    pub verification_service: VerificationService,
    pub privacy_service: PrivacyService,
    pub activity_service: ActivityService,
    pub following_service: FollowingService,
    pub anime_service: AnimeService,
    pub person_service: PersonService,
    pub comment_service: CommentService,
    pub reply_service: ReplyService,
    pub like_service: LikeService,
    pub watch_status_service: WatchStatusService,
    pub report_service: ReportService,
    pub moderation_service: ModerationService,
    pub recommendation_service: RecommendationService,
    pub search_service: SearchService,
    pub sync_service: SyncService,
    pub rate_limiter: ApiRateLimiter,
    pub trusted_proxies: TrustedProxies,
}

impl AppState {
    /// Wire every repository and service over one connection and cache.
    pub fn new(
        db: Arc<DatabaseConnection>,
        cache: SharedCache,
        mailer: Arc<dyn Mailer>,
        config: &Config,
    ) -> AppResult<Self> {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let profile_repo = UserProfileRepository::new(Arc::clone(&db));
        let follow_repo = UserFollowRepository::new(Arc::clone(&db));
        let ban_repo = UserBanRepository::new(Arc::clone(&db));
        let privacy_repo = PrivacySettingRepository::new(Arc::clone(&db));
        let activity_repo = ActivityRepository::new(Arc::clone(&db));
        let anime_repo = AnimeRepository::new(Arc::clone(&db));
        let episode_repo = EpisodeRepository::new(Arc::clone(&db));
        let character_repo = CharacterRepository::new(Arc::clone(&db));
        let person_repo = PersonRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let reply_repo = ReplyRepository::new(Arc::clone(&db));
        let like_repo = LikeRepository::new(Arc::clone(&db));
        let watch_repo = WatchStatusRepository::new(Arc::clone(&db));
        let report_repo = ReportRepository::new(Arc::clone(&db));
        let sync_log_repo = SyncLogRepository::new(Arc::clone(&db));

        let token_service = TokenService::new(&config.jwt, cache.clone());
        let email_service = EmailService::new(mailer, config.server.site_name.clone());
        let verification_service = VerificationService::new(
            cache.clone(),
            user_repo.clone(),
            email_service,
            config.verification.clone(),
        );
        let account_service = AccountService::new(
            user_repo.clone(),
            profile_repo.clone(),
            follow_repo.clone(),
            ban_repo.clone(),
            token_service.clone(),
            verification_service.clone(),
        );
        let privacy_service = PrivacyService::new(privacy_repo, follow_repo.clone());
        let activity_service =
            ActivityService::new(activity_repo, follow_repo.clone(), privacy_service.clone());
        let following_service = FollowingService::new(
            follow_repo.clone(),
            user_repo.clone(),
            profile_repo.clone(),
            privacy_service.clone(),
            activity_service.clone(),
        );
        let anime_service = AnimeService::new(
            anime_repo.clone(),
            episode_repo.clone(),
            character_repo.clone(),
            watch_repo.clone(),
            comment_repo.clone(),
            activity_service.clone(),
        );
        let person_service = PersonService::new(person_repo.clone());
        let comment_service = CommentService::new(
            comment_repo.clone(),
            anime_repo.clone(),
            episode_repo,
            character_repo.clone(),
            person_repo.clone(),
            like_repo.clone(),
            user_repo.clone(),
            profile_repo.clone(),
            activity_service.clone(),
        );
        let reply_service = ReplyService::new(
            reply_repo.clone(),
            comment_repo.clone(),
            like_repo.clone(),
            user_repo.clone(),
            profile_repo.clone(),
            activity_service.clone(),
        );
        let like_service = LikeService::new(
            like_repo,
            comment_repo.clone(),
            reply_repo.clone(),
            activity_service.clone(),
        );
        let watch_status_service = WatchStatusService::new(
            watch_repo.clone(),
            anime_repo.clone(),
            user_repo.clone(),
            privacy_service.clone(),
            activity_service.clone(),
        );
        let report_service = ReportService::new(
            report_repo,
            anime_repo.clone(),
            comment_repo.clone(),
            reply_repo,
            user_repo.clone(),
        );
        let moderation_service = ModerationService::new(user_repo.clone(), ban_repo);
        let recommendation_service = RecommendationService::new(
            anime_repo.clone(),
            comment_repo,
            watch_repo,
            follow_repo,
            user_repo.clone(),
            cache.clone(),
            config.recommendation.cache_ttl_secs,
        );
        let search_service = SearchService::new(
            anime_repo.clone(),
            user_repo,
            profile_repo,
            character_repo,
            person_repo,
        );
        let sync_service =
            SyncService::new(anime_repo, sync_log_repo, cache.clone(), &config.sync)?;
        let rate_limiter = ApiRateLimiter::new(cache);
        let trusted_proxies = TrustedProxies::parse(&config.server.trusted_proxies)?;

        Ok(Self {
            account_service,
            token_service,
            verification_service,
            privacy_service,
            activity_service,
            following_service,
            anime_service,
            person_service,
            comment_service,
            reply_service,
            like_service,
            watch_status_service,
            report_service,
            moderation_service,
            recommendation_service,
            search_service,
            sync_service,
            rate_limiter,
            trusted_proxies,
        })
    }
}

/// Authentication middleware.
///
/// A request without a bearer token passes through anonymously. A token that
/// is present but invalid, expired, revoked or belongs to a banned user is
/// rejected here so every route treats it the same way.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    if let Some(token) = token {
        let user = match state.token_service.verify(&token, TokenType::Access).await {
            Ok(claims) => state.account_service.authenticate(&claims.sub).await,
            Err(e) => Err(e),
        };
        match user {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(req).await
}
