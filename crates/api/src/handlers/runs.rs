//! Handlers for run history.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;

use flowline_core::error::CoreError;
use flowline_core::pagination::{clamp_limit, clamp_offset, DEFAULT_RUN_LIMIT, MAX_RUN_LIMIT};
use flowline_core::types::DbId;
use flowline_core::workflow::RunStatus;
use flowline_db::models::run::{RunFilter, RunWithResults};
use flowline_db::repositories::{RunRepo, WorkflowRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::RunListParams;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

/// GET /api/v1/workflows/{id}/runs
///
/// Paginated run history for a workflow, newest first. `limit` is capped
/// at 100 (default 50); `status` filters on run status.
pub async fn list_runs(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
    Query(params): Query<RunListParams>,
) -> AppResult<impl IntoResponse> {
    // Verify the workflow exists in the caller's org.
    WorkflowRepo::find_by_id(&state.pool, auth.org_id, workflow_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id: workflow_id,
        }))?;

    if let Some(ref status) = params.status {
        RunStatus::parse(status).map_err(AppError::Core)?;
    }

    let filter = RunFilter {
        status: params.status.clone(),
        limit: params.limit,
        offset: params.offset,
    };
    let (runs, total) =
        RunRepo::list_for_workflow(&state.pool, auth.org_id, workflow_id, &filter).await?;

    Ok(Json(PagedResponse {
        data: runs,
        total,
        limit: clamp_limit(params.limit, DEFAULT_RUN_LIMIT, MAX_RUN_LIMIT),
        offset: clamp_offset(params.offset),
    }))
}

/// GET /api/v1/runs/{id}
///
/// Fetch one run with its step results.
pub async fn get_run(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(run_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let run = RunRepo::find_by_id(&state.pool, auth.org_id, run_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Run",
            id: run_id,
        }))?;

    let step_results = RunRepo::list_step_results(&state.pool, run.id).await?;

    Ok(Json(DataResponse {
        data: RunWithResults { run, step_results },
    }))
}
