//! Comment and reply endpoints.

use anitrack_common::AppResult;
use anitrack_core::{
    CommentPage, CreateReplyInput, EditCommentInput, ListCommentsQuery, PageParams, ReplyPage,
    UpsertCommentInput,
};
use anitrack_db::entities::{comment, reply};
use axum::{
    Router,
    extract::State,
    routing::{delete, get},
};

use crate::{
    extractors::{AuthUser, Json, MaybeAuthUser, Path, Query},
    middleware::AppState,
    response::ApiResponse,
};

/// Comments on a target.
async fn list(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListCommentsQuery>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<CommentPage>> {
    Ok(ApiResponse::ok(
        state.comment_service.list(viewer.id(), query, page).await?,
    ))
}

/// Create the caller's comment on a target, or update it if one exists.
async fn upsert(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpsertCommentInput>,
) -> AppResult<ApiResponse<comment::Model>> {
    let (comment, created) = state.comment_service.upsert(&user.id, input).await?;
    if created {
        Ok(ApiResponse::created(comment))
    } else {
        Ok(ApiResponse::ok(comment).with_message("Updated"))
    }
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<comment::Model>> {
    Ok(ApiResponse::ok(state.comment_service.get(&id).await?))
}

async fn edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<EditCommentInput>,
) -> AppResult<ApiResponse<comment::Model>> {
    Ok(ApiResponse::ok(
        state.comment_service.edit(&user.id, &id, input).await?,
    ))
}

async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.comment_service.delete(&user, &id).await?;
    Ok(ApiResponse::empty().with_message("Deleted"))
}

async fn list_replies(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<ReplyPage>> {
    Ok(ApiResponse::ok(
        state.reply_service.list(viewer.id(), &id, page).await?,
    ))
}

async fn create_reply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateReplyInput>,
) -> AppResult<ApiResponse<reply::Model>> {
    Ok(ApiResponse::created(
        state.reply_service.create(&user.id, &id, input).await?,
    ))
}

async fn remove_reply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.reply_service.delete(&user, &id).await?;
    Ok(ApiResponse::empty().with_message("Deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(upsert))
        .route("/{id}", get(show).patch(edit).delete(remove))
        .route("/{id}/replies", get(list_replies).post(create_reply))
}

pub fn replies_router() -> Router<AppState> {
    Router::new().route("/{id}", delete(remove_reply))
}
