//! Handlers for the `/workflows` resource.
//!
//! All endpoints require authentication via [`AuthUser`]; every query is
//! scoped to the session's organization. Deleting a workflow additionally
//! requires the admin role.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use flowline_core::condition::Condition;
use flowline_core::error::CoreError;
use flowline_core::types::DbId;
use flowline_core::workflow::{
    validate_action_config, validate_trigger_config, validate_workflow_description,
    validate_workflow_name, ActionType, TriggerKind, TriggerType, MAX_STEPS_PER_WORKFLOW,
};
use flowline_db::models::workflow::{
    CreateWorkflow, CreateWorkflowStep, UpdateWorkflow, WorkflowWithSteps,
};
use flowline_db::repositories::WorkflowRepo;
use flowline_engine::trigger::manual_payload;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate a step list: bounded size, known action types, per-action
/// config shape, parseable conditions, and unique step orders.
fn validate_steps(steps: &[CreateWorkflowStep]) -> AppResult<()> {
    if steps.len() > MAX_STEPS_PER_WORKFLOW {
        return Err(AppError::BadRequest(format!(
            "A workflow may have at most {MAX_STEPS_PER_WORKFLOW} steps"
        )));
    }

    let mut orders = HashSet::new();
    for step in steps {
        let action = ActionType::parse(&step.action_type).map_err(AppError::Core)?;
        validate_action_config(action, &step.action_config).map_err(AppError::Core)?;

        if let Some(condition) = &step.condition {
            Condition::from_value(condition).map_err(AppError::Core)?;
        }

        if !orders.insert(step.step_order) {
            return Err(AppError::BadRequest(format!(
                "Duplicate step_order {}: execution order would be undefined",
                step.step_order
            )));
        }
    }
    Ok(())
}

/// Fetch a workflow scoped to the caller's org or return 404.
async fn find_or_404(
    pool: &sqlx::PgPool,
    org_id: DbId,
    workflow_id: DbId,
) -> AppResult<flowline_db::models::workflow::Workflow> {
    WorkflowRepo::find_by_id(pool, org_id, workflow_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id: workflow_id,
        }))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows
///
/// Create a workflow with its steps.
pub async fn create_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateWorkflow>,
) -> AppResult<impl IntoResponse> {
    validate_workflow_name(&input.name).map_err(AppError::Core)?;
    if let Some(ref description) = input.description {
        validate_workflow_description(description).map_err(AppError::Core)?;
    }

    let trigger_type = TriggerType::parse(&input.trigger_type).map_err(AppError::Core)?;
    let trigger_config = input.trigger_config.clone().unwrap_or_else(|| json!({}));
    validate_trigger_config(trigger_type, &trigger_config).map_err(AppError::Core)?;

    validate_steps(&input.steps)?;

    let workflow = WorkflowRepo::create(
        &state.pool,
        auth.org_id,
        input.name.trim(),
        input.description.as_deref(),
        trigger_type.as_str(),
        &trigger_config,
        input.is_active.unwrap_or(true),
        Some(auth.user_id),
    )
    .await?;

    let steps = WorkflowRepo::replace_steps(&state.pool, workflow.id, &input.steps).await?;

    tracing::info!(
        workflow_id = workflow.id,
        org_id = auth.org_id,
        user_id = auth.user_id,
        trigger_type = %trigger_type,
        step_count = steps.len(),
        "Workflow created",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: WorkflowWithSteps { workflow, steps },
        }),
    ))
}

/// GET /api/v1/workflows
///
/// List the organization's workflows.
pub async fn list_workflows(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<impl IntoResponse> {
    let workflows =
        WorkflowRepo::list(&state.pool, auth.org_id, params.include_inactive).await?;
    Ok(Json(DataResponse { data: workflows }))
}

/// GET /api/v1/workflows/{id}
///
/// Fetch one workflow with its steps.
pub async fn get_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let workflow = find_or_404(&state.pool, auth.org_id, workflow_id).await?;
    let steps = WorkflowRepo::list_steps(&state.pool, workflow.id).await?;

    Ok(Json(DataResponse {
        data: WorkflowWithSteps { workflow, steps },
    }))
}

/// PUT /api/v1/workflows/{id}
///
/// Update a workflow; a provided step list replaces the existing steps.
pub async fn update_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
    Json(input): Json<UpdateWorkflow>,
) -> AppResult<impl IntoResponse> {
    let existing = find_or_404(&state.pool, auth.org_id, workflow_id).await?;

    if let Some(ref name) = input.name {
        validate_workflow_name(name).map_err(AppError::Core)?;
    }
    if let Some(ref description) = input.description {
        validate_workflow_description(description).map_err(AppError::Core)?;
    }

    // Validate the effective trigger: a new config against a new or
    // existing type, and vice versa.
    let effective_type = input
        .trigger_type
        .as_deref()
        .unwrap_or(&existing.trigger_type);
    let trigger_type = TriggerType::parse(effective_type).map_err(AppError::Core)?;
    let effective_config = input
        .trigger_config
        .as_ref()
        .unwrap_or(&existing.trigger_config);
    validate_trigger_config(trigger_type, effective_config).map_err(AppError::Core)?;

    if let Some(ref steps) = input.steps {
        validate_steps(steps)?;
    }

    let updated = WorkflowRepo::update(&state.pool, auth.org_id, workflow_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id: workflow_id,
        }))?;

    let steps = match input.steps {
        Some(ref steps) => WorkflowRepo::replace_steps(&state.pool, workflow_id, steps).await?,
        None => WorkflowRepo::list_steps(&state.pool, workflow_id).await?,
    };

    tracing::info!(
        workflow_id,
        org_id = auth.org_id,
        user_id = auth.user_id,
        "Workflow updated",
    );

    Ok(Json(DataResponse {
        data: WorkflowWithSteps {
            workflow: updated,
            steps,
        },
    }))
}

/// DELETE /api/v1/workflows/{id}
///
/// Delete a workflow. Workflows with recorded runs cannot be deleted;
/// deactivate them instead.
pub async fn delete_workflow(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_or_404(&state.pool, admin.org_id, workflow_id).await?;

    let runs = WorkflowRepo::run_count(&state.pool, workflow_id).await?;
    if runs > 0 {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Workflow has {runs} recorded runs; deactivate it instead of deleting"
        ))));
    }

    WorkflowRepo::delete(&state.pool, admin.org_id, workflow_id).await?;

    tracing::info!(
        workflow_id,
        org_id = admin.org_id,
        user_id = admin.user_id,
        "Workflow deleted",
    );

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Activation
// ---------------------------------------------------------------------------

/// PATCH /api/v1/workflows/{id}/activate
pub async fn activate_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    set_active(auth, state, workflow_id, true).await
}

/// PATCH /api/v1/workflows/{id}/deactivate
pub async fn deactivate_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    set_active(auth, state, workflow_id, false).await
}

async fn set_active(
    auth: AuthUser,
    state: AppState,
    workflow_id: DbId,
    is_active: bool,
) -> AppResult<impl IntoResponse> {
    let updated = WorkflowRepo::set_active(&state.pool, auth.org_id, workflow_id, is_active).await?;
    if !updated {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id: workflow_id,
        }));
    }

    tracing::info!(
        workflow_id,
        org_id = auth.org_id,
        user_id = auth.user_id,
        is_active,
        "Workflow activation changed",
    );

    Ok(Json(DataResponse {
        data: json!({ "id": workflow_id, "is_active": is_active }),
    }))
}

// ---------------------------------------------------------------------------
// Manual test runs
// ---------------------------------------------------------------------------

/// Request body for manual test runs.
#[derive(Debug, serde::Deserialize, Default)]
pub struct TestRunRequest {
    /// Caller-supplied trigger data handed to the run as-is.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// POST /api/v1/workflows/{id}/test
///
/// Start a manual test run. Permitted regardless of `is_active`; the run
/// executes detached and the response returns before it completes.
pub async fn test_run_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
    Json(body): Json<TestRunRequest>,
) -> AppResult<impl IntoResponse> {
    let workflow = find_or_404(&state.pool, auth.org_id, workflow_id).await?;

    let payload = manual_payload(body.data, auth.user_id);

    let run = state
        .runner
        .start_run(&workflow, TriggerKind::Manual, payload)
        .await?;

    tracing::info!(
        workflow_id,
        run_id = run.id,
        user_id = auth.user_id,
        "Manual test run started",
    );

    state.runner.spawn(run.clone());

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: run })))
}
