//! Authentication endpoints.

use anitrack_common::AppResult;
use anitrack_core::{
    AuthResponse, ChangeEmailInput, ChangePasswordInput, CodePurpose, LoginInput, RegisterInput,
    ResetPasswordInput, TokenPair,
};
use anitrack_db::entities::user;
use axum::{Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, ClientIp, Json},
    middleware::AppState,
    response::ApiResponse,
};

/// Verification code request.
#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
    pub purpose: CodePurpose,
}

/// Send a one-time code by email.
async fn send_code(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(req): Json<SendCodeRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .verification_service
        .send_code(req.purpose, &req.email, ip.as_key().as_deref())
        .await?;
    Ok(ApiResponse::empty().with_message("Verification code sent"))
}

/// Create an account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let auth = state.account_service.register(input).await?;
    Ok(ApiResponse::created(auth))
}

/// Sign in with username or email and password.
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    Ok(ApiResponse::ok(
        state.account_service.login_password(input).await?,
    ))
}

/// Code sign-in request.
#[derive(Debug, Deserialize)]
pub struct CodeLoginRequest {
    pub email: String,
    pub code: String,
}

/// Sign in with an emailed code.
async fn login_code(
    State(state): State<AppState>,
    Json(req): Json<CodeLoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    Ok(ApiResponse::ok(
        state.account_service.login_code(&req.email, &req.code).await?,
    ))
}

/// Refresh token request.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Rotated token pair.
#[derive(Serialize)]
pub struct RefreshResponse {
    pub user: user::Model,
    pub tokens: TokenPair,
}

/// Exchange a refresh token for a new pair.
async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<ApiResponse<RefreshResponse>> {
    let (user_id, tokens) = state.token_service.refresh(&req.refresh_token).await?;
    // Banned users cannot keep a session alive
    let user = state.account_service.authenticate(&user_id).await?;
    Ok(ApiResponse::ok(RefreshResponse { user, tokens }))
}

/// Revoke a refresh token.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .token_service
        .logout(&user.id, &req.refresh_token)
        .await?;
    Ok(ApiResponse::empty().with_message("Logged out"))
}

/// Reset a forgotten password with an emailed code.
async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordInput>,
) -> AppResult<ApiResponse<()>> {
    state.account_service.reset_password(input).await?;
    Ok(ApiResponse::empty().with_message("Password reset"))
}

/// Change the caller's password.
async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ChangePasswordInput>,
) -> AppResult<ApiResponse<()>> {
    state
        .account_service
        .change_password(&user.id, input)
        .await?;
    Ok(ApiResponse::empty().with_message("Password changed"))
}

/// Change the caller's email address.
async fn change_email(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ChangeEmailInput>,
) -> AppResult<ApiResponse<user::Model>> {
    Ok(ApiResponse::ok(
        state.account_service.change_email(&user.id, input).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/code", post(send_code))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/login/code", post(login_code))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/password/reset", post(reset_password))
        .route("/password/change", post(change_password))
        .route("/email/change", post(change_email))
}
