//! Route table assembly.

pub mod health;
pub mod hooks;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/workflows", workflows::router())
        .nest("/runs", workflows::runs_router())
        .nest("/hooks", hooks::router())
}
