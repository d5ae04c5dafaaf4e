//! HTTP API layer for anitrack.
//!
//! This crate provides the JSON REST API served under `/api`:
//!
//! - **Endpoints**: accounts, social graph, catalog, comments, search,
//!   recommendations and administration
//! - **Extractors**: bearer authentication, client IP, envelope-aware JSON and query
//! - **Middleware**: token resolution, per-caller rate limits and the shared [`AppState`]
//!
//! Every response uses the `{"code", "message", "data"}` envelope.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
