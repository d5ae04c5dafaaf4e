//! API endpoints.

#![allow(missing_docs)]

mod admin;
mod anime;
mod auth;
mod comments;
mod discover;
mod health;
mod likes;
mod people;
mod reports;
mod users;

use axum::{Router, middleware::from_fn_with_state};

use crate::{
    middleware::{AppState, auth_middleware},
    rate_limit::{rate_limit_auth_middleware, rate_limit_middleware},
};

/// Create the API router with bearer authentication and rate limits applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(discover::router())
        .merge(anime::lookup_router())
        .nest(
            "/auth",
            auth::router().layer(from_fn_with_state(state.clone(), rate_limit_auth_middleware)),
        )
        .nest("/users", users::router())
        .nest("/anime", anime::router())
        .nest("/people", people::router())
        .nest("/comments", comments::router())
        .nest("/replies", comments::replies_router())
        .nest("/likes", likes::router())
        .nest("/reports", reports::router())
        .nest("/admin", admin::router())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
