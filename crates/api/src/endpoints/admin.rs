//! Admin endpoints: reports, bans and catalog sync.

use anitrack_common::AppResult;
use anitrack_core::{BanUserInput, BannedUsersPage, HandleReportInput, PageParams, ReportQuery};
use anitrack_db::entities::{
    report,
    sync_log::{self, SyncJob},
    user, user_ban,
};
use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    extractors::{AdminUser, Json, Path, Query},
    middleware::AppState,
    response::{ApiResponse, Paged},
};

async fn list_reports(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<Paged<report::Model>>> {
    let items = state.report_service.list(query, page).await?;
    Ok(ApiResponse::ok(Paged {
        items,
        page: page.page,
        limit: page.limit(),
    }))
}

/// Resolve or reject a pending report.
async fn handle_report(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<HandleReportInput>,
) -> AppResult<ApiResponse<report::Model>> {
    Ok(ApiResponse::ok(
        state.report_service.handle(&admin, &id, input).await?,
    ))
}

async fn ban(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<BanUserInput>,
) -> AppResult<ApiResponse<user_ban::Model>> {
    Ok(ApiResponse::created(
        state.moderation_service.ban(&admin, &id, input).await?,
    ))
}

async fn unban(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<user::Model>> {
    Ok(ApiResponse::ok(
        state.moderation_service.unban(&admin, &id).await?,
    ))
}

async fn banned_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<BannedUsersPage>> {
    Ok(ApiResponse::ok(
        state.moderation_service.banned_users(page).await?,
    ))
}

async fn ban_history(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<PageParams>,
) -> AppResult<ApiResponse<Paged<user_ban::Model>>> {
    let items = state.moderation_service.ban_history(&id, page).await?;
    Ok(ApiResponse::ok(Paged {
        items,
        page: page.page,
        limit: page.limit(),
    }))
}

/// Run a sync job now. The returned log row says whether it succeeded.
async fn run_sync(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(job): Path<SyncJob>,
) -> AppResult<ApiResponse<sync_log::Model>> {
    tracing::info!(admin_id = %admin.id, job = %job, "Sync triggered by admin");
    let log = state.sync_service.run(job).await?;
    let message = if log.success { "Sync finished" } else { "Sync failed" };
    Ok(ApiResponse::ok(log).with_message(message))
}

/// Sync log filter.
#[derive(Debug, Deserialize)]
pub struct SyncLogQuery {
    pub job: Option<SyncJob>,
    pub limit: Option<u64>,
}

async fn sync_logs(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<SyncLogQuery>,
) -> AppResult<ApiResponse<Vec<sync_log::Model>>> {
    Ok(ApiResponse::ok(
        state
            .sync_service
            .recent_logs(query.job, query.limit.unwrap_or(20))
            .await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/{id}/handle", post(handle_report))
        .route("/users/banned", get(banned_users))
        .route("/users/{id}/ban", post(ban))
        .route("/users/{id}/unban", post(unban))
        .route("/users/{id}/bans", get(ban_history))
        .route("/sync/logs", get(sync_logs))
        .route("/sync/{job}", post(run_sync))
}
