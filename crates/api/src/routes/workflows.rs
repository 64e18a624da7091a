//! Route definitions for workflows and run history.
//!
//! ```text
//! WORKFLOWS:
//! POST   /                   create_workflow
//! GET    /                   list_workflows (?include_inactive)
//! GET    /{id}               get_workflow
//! PUT    /{id}               update_workflow
//! DELETE /{id}               delete_workflow (admin)
//! PATCH  /{id}/activate      activate_workflow
//! PATCH  /{id}/deactivate    deactivate_workflow
//! POST   /{id}/test          test_run_workflow
//! GET    /{id}/runs          list_runs (?status, limit, offset)
//!
//! RUNS (merged into /runs):
//! GET    /{id}               get_run
//! ```

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{runs, workflows};
use crate::state::AppState;

/// Workflow routes -- mounted at `/workflows`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(workflows::create_workflow).get(workflows::list_workflows),
        )
        .route(
            "/{id}",
            get(workflows::get_workflow)
                .put(workflows::update_workflow)
                .delete(workflows::delete_workflow),
        )
        .route("/{id}/activate", patch(workflows::activate_workflow))
        .route("/{id}/deactivate", patch(workflows::deactivate_workflow))
        .route("/{id}/test", post(workflows::test_run_workflow))
        .route("/{id}/runs", get(runs::list_runs))
}

/// Run routes -- mounted at `/runs`.
pub fn runs_router() -> Router<AppState> {
    Router::new().route("/{id}", get(runs::get_run))
}
