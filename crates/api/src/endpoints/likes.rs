//! Like endpoints.

use anitrack_common::AppResult;
use anitrack_core::{LikeInput, LikeOutcome};
use axum::{Router, extract::State, routing::post};

use crate::{
    extractors::{AuthUser, Json},
    middleware::AppState,
    response::ApiResponse,
};

/// Like a comment or reply. Liking twice changes nothing.
async fn like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LikeInput>,
) -> AppResult<ApiResponse<LikeOutcome>> {
    Ok(ApiResponse::ok(
        state.like_service.like(&user.id, &input).await?,
    ))
}

async fn unlike(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LikeInput>,
) -> AppResult<ApiResponse<LikeOutcome>> {
    Ok(ApiResponse::ok(
        state.like_service.unlike(&user.id, &input).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(like).delete(unlike))
}
