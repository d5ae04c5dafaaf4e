//! Search, recommendations and the activity feed.

use anitrack_common::AppResult;
use anitrack_core::{
    PageParams, RecommendationPage, RecommendationQuery, SearchQuery, SearchResults,
    UserRecommendationPage,
};
use anitrack_db::entities::activity;
use axum::{Router, extract::State, routing::get};

use crate::{
    extractors::{AuthUser, MaybeAuthUser, Query},
    middleware::AppState,
    response::{ApiResponse, Paged},
};

/// Search anime, items, users, characters and people.
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<SearchResults>> {
    Ok(ApiResponse::ok(state.search_service.search(query).await?))
}

/// Personalised recommendations; anonymous callers get popular entries.
async fn recommendations(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<RecommendationPage>> {
    Ok(ApiResponse::ok(
        state
            .recommendation_service
            .recommend(viewer.id(), query, page)
            .await?,
    ))
}

/// Users the caller might follow, by shared watch statuses.
async fn recommended_users(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<UserRecommendationPage>> {
    Ok(ApiResponse::ok(
        state
            .recommendation_service
            .recommend_users(&user.id, page)
            .await?,
    ))
}

/// Activities of the users the caller follows.
async fn feed(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<Paged<activity::Model>>> {
    let items = state.activity_service.feed(&user.id, page).await?;
    Ok(ApiResponse::ok(Paged {
        items,
        page: page.page,
        limit: page.limit(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/recommendations", get(recommendations))
        .route("/recommendations/users", get(recommended_users))
        .route("/feed", get(feed))
}
