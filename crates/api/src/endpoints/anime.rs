//! Catalog endpoints: anime, items, episodes, characters and watch status.

use anitrack_common::AppResult;
use anitrack_core::{
    AnimeDetail, AnimePage, CreateAnimeInput, CreateCharacterInput, CreateEpisodeInput,
    ListAnimeQuery, PageParams, SetWatchStatusInput, UpdateAnimeInput,
};
use anitrack_db::entities::{anime, character, episode, watch_status};
use axum::{
    Router,
    extract::State,
    routing::{get, put},
};
use serde::Serialize;

use crate::{
    extractors::{AuthUser, Json, MaybeAuthUser, Path, Query},
    middleware::AppState,
    response::ApiResponse,
};

/// List catalog entries.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListAnimeQuery>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<AnimePage>> {
    Ok(ApiResponse::ok(state.anime_service.list(query, page).await?))
}

/// Create an anime (admins) or an item (anyone signed in).
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateAnimeInput>,
) -> AppResult<ApiResponse<anime::Model>> {
    Ok(ApiResponse::created(
        state.anime_service.create(&user, input).await?,
    ))
}

/// Entry detail with the caller's own state.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<AnimeDetail>> {
    Ok(ApiResponse::ok(
        state.anime_service.detail(viewer.id(), &id).await?,
    ))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateAnimeInput>,
) -> AppResult<ApiResponse<anime::Model>> {
    Ok(ApiResponse::ok(
        state.anime_service.update(&user, &id, input).await?,
    ))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.anime_service.delete(&user, &id).await?;
    Ok(ApiResponse::empty().with_message("Deleted"))
}

async fn list_episodes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<episode::Model>>> {
    Ok(ApiResponse::ok(
        state.anime_service.list_episodes(&id).await?,
    ))
}

async fn create_episode(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateEpisodeInput>,
) -> AppResult<ApiResponse<episode::Model>> {
    Ok(ApiResponse::created(
        state.anime_service.create_episode(&user, &id, input).await?,
    ))
}

async fn list_characters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<character::Model>>> {
    Ok(ApiResponse::ok(
        state.anime_service.list_characters(&id).await?,
    ))
}

async fn create_character(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateCharacterInput>,
) -> AppResult<ApiResponse<character::Model>> {
    Ok(ApiResponse::created(
        state
            .anime_service
            .create_character(&user, &id, input)
            .await?,
    ))
}

/// Set the caller's watch status for an entry.
async fn set_watch_status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<SetWatchStatusInput>,
) -> AppResult<ApiResponse<watch_status::Model>> {
    Ok(ApiResponse::ok(
        state
            .watch_status_service
            .set(&user.id, &id, input.status)
            .await?,
    ))
}

/// Watch status removal result.
#[derive(Serialize)]
pub struct RemoveWatchStatusResponse {
    pub removed: bool,
}

async fn remove_watch_status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<RemoveWatchStatusResponse>> {
    let removed = state.watch_status_service.remove(&user.id, &id).await?;
    Ok(ApiResponse::ok(RemoveWatchStatusResponse { removed }))
}

async fn show_episode(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<episode::Model>> {
    Ok(ApiResponse::ok(state.anime_service.get_episode(&id).await?))
}

async fn show_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<character::Model>> {
    Ok(ApiResponse::ok(
        state.anime_service.get_character(&id).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/episodes", get(list_episodes).post(create_episode))
        .route(
            "/{id}/characters",
            get(list_characters).post(create_character),
        )
        .route(
            "/{id}/watch-status",
            put(set_watch_status).delete(remove_watch_status),
        )
}

/// Single episode and character lookups, used as comment targets.
pub fn lookup_router() -> Router<AppState> {
    Router::new()
        .route("/episodes/{id}", get(show_episode))
        .route("/characters/{id}", get(show_character))
}
