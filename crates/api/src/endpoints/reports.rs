//! Report endpoints.

use anitrack_common::AppResult;
use anitrack_core::CreateReportInput;
use anitrack_db::entities::report;
use axum::{Router, extract::State, routing::post};

use crate::{
    extractors::{AuthUser, Json},
    middleware::AppState,
    response::ApiResponse,
};

/// File a report against an anime, comment, reply or user.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateReportInput>,
) -> AppResult<ApiResponse<report::Model>> {
    Ok(ApiResponse::created(
        state.report_service.create(&user.id, input).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create))
}
