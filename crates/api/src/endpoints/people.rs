//! People endpoints.

use anitrack_common::AppResult;
use anitrack_core::{CreatePersonInput, PageParams};
use anitrack_db::entities::person;
use axum::{Router, extract::State, routing::get};

use crate::{
    extractors::{AuthUser, Json, Path, Query},
    middleware::AppState,
    response::{ApiResponse, Paged},
};

async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<Paged<person::Model>>> {
    let items = state.person_service.list(page).await?;
    Ok(ApiResponse::ok(Paged {
        items,
        page: page.page,
        limit: page.limit(),
    }))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePersonInput>,
) -> AppResult<ApiResponse<person::Model>> {
    Ok(ApiResponse::created(
        state.person_service.create(&user, input).await?,
    ))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<person::Model>> {
    Ok(ApiResponse::ok(state.person_service.get(&id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show))
}
