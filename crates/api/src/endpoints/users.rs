//! User endpoints: profiles, privacy, following and per-user lists.

use anitrack_common::AppResult;
use anitrack_core::{
    FollowResult, PageParams, PrivacySettings, ProfileResponse, UpdatePrivacyInput,
    UpdateProfileInput, UserSummary, WatchlistPage, WatchlistQuery,
};
use anitrack_db::entities::activity;
use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    extractors::{AuthUser, Json, MaybeAuthUser, Path, Query},
    middleware::AppState,
    response::{ApiResponse, Paged},
};

/// Get a user's public profile.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    Ok(ApiResponse::ok(
        state.account_service.get_profile(viewer.id(), &id).await?,
    ))
}

/// Get the caller's own profile.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    Ok(ApiResponse::ok(
        state
            .account_service
            .get_profile(Some(&user.id), &user.id)
            .await?,
    ))
}

/// Update the caller's profile.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<ProfileResponse>> {
    Ok(ApiResponse::ok(
        state.account_service.update_profile(&user.id, input).await?,
    ))
}

async fn get_privacy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PrivacySettings>> {
    Ok(ApiResponse::ok(
        state.privacy_service.get_settings(&user.id).await?,
    ))
}

async fn update_privacy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdatePrivacyInput>,
) -> AppResult<ApiResponse<PrivacySettings>> {
    Ok(ApiResponse::ok(
        state.privacy_service.update_settings(&user.id, input).await?,
    ))
}

/// Follow a user.
async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FollowResult>> {
    let result = state.following_service.follow(&user.id, &id).await?;
    if result.created {
        Ok(ApiResponse::created(result))
    } else {
        Ok(ApiResponse::ok(result).with_message("Already following"))
    }
}

/// Unfollow response.
#[derive(Serialize)]
pub struct UnfollowResponse {
    pub removed: bool,
}

/// Unfollow a user.
async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UnfollowResponse>> {
    let removed = state.following_service.unfollow(&user.id, &id).await?;
    Ok(ApiResponse::ok(UnfollowResponse { removed }))
}

async fn followers(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<Paged<UserSummary>>> {
    let items = state
        .following_service
        .followers(viewer.id(), &id, page)
        .await?;
    Ok(ApiResponse::ok(Paged {
        items,
        page: page.page,
        limit: page.limit(),
    }))
}

async fn followings(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<Paged<UserSummary>>> {
    let items = state
        .following_service
        .followings(viewer.id(), &id, page)
        .await?;
    Ok(ApiResponse::ok(Paged {
        items,
        page: page.page,
        limit: page.limit(),
    }))
}

/// A user's watchlist, optionally filtered by status.
async fn watchlist(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<WatchlistQuery>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<WatchlistPage>> {
    Ok(ApiResponse::ok(
        state
            .watch_status_service
            .list(viewer.id(), &id, query, page)
            .await?,
    ))
}

async fn activities(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<Paged<activity::Model>>> {
    let items = state
        .activity_service
        .user_activities(viewer.id(), &id, page)
        .await?;
    Ok(ApiResponse::ok(Paged {
        items,
        page: page.page,
        limit: page.limit(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).patch(update_me))
        .route("/me/privacy", get(get_privacy).patch(update_privacy))
        .route("/{id}", get(show))
        .route("/{id}/follow", post(follow).delete(unfollow))
        .route("/{id}/followers", get(followers))
        .route("/{id}/followings", get(followings))
        .route("/{id}/watchlist", get(watchlist))
        .route("/{id}/activities", get(activities))
}
