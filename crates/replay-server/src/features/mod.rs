//! Feature slices of the replay API
//!
//! Each slice keeps write operations in `commands/`, reads in `queries/` and
//! the Axum wiring in `routes.rs`. Handlers call the command or query
//! `handle` function directly.

pub mod replays;
pub mod shared;

use axum::Router;

use crate::api::AppState;

/// Feature routes, mounted under `/api/v1`
pub fn router() -> Router<AppState> {
    Router::new().nest("/replays", replays::routes::replays_routes())
}
