//! Repository for the `workflow_runs` and `workflow_step_results` tables.

use sqlx::PgPool;

use flowline_core::pagination::{clamp_limit, clamp_offset, DEFAULT_RUN_LIMIT, MAX_RUN_LIMIT};
use flowline_core::types::DbId;

use crate::models::run::{NewStepResult, RunFilter, StepResult, WorkflowRun};

/// Column list for run queries.
const RUN_COLUMNS: &str = "id, workflow_id, org_id, status, trigger_kind, trigger_payload, \
    error, started_at, ended_at";

/// Column list for step-result queries.
const RESULT_COLUMNS: &str = "id, run_id, step_id, step_order, action_type, status, output, \
    error, started_at, ended_at";

/// Provides read/write operations for runs and their step results.
pub struct RunRepo;

impl RunRepo {
    /// Insert a new run in `pending` status, returning the created row.
    pub async fn create(
        pool: &PgPool,
        workflow_id: DbId,
        org_id: DbId,
        trigger_kind: &str,
        trigger_payload: &serde_json::Value,
    ) -> Result<WorkflowRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_runs (workflow_id, org_id, trigger_kind, trigger_payload)
             VALUES ($1, $2, $3, $4)
             RETURNING {RUN_COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowRun>(&query)
            .bind(workflow_id)
            .bind(org_id)
            .bind(trigger_kind)
            .bind(trigger_payload)
            .fetch_one(pool)
            .await
    }

    /// Transition a run from `pending` to `running`.
    pub async fn mark_running(pool: &PgPool, run_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflow_runs SET status = 'running' WHERE id = $1")
            .bind(run_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Write a run's terminal status, error, and end timestamp.
    ///
    /// Guarded to only touch non-terminal runs; terminal runs are immutable.
    pub async fn finalize(
        pool: &PgPool,
        run_id: DbId,
        status: &str,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workflow_runs SET status = $1, error = $2, ended_at = now() \
             WHERE id = $3 AND status IN ('pending', 'running')",
        )
        .bind(status)
        .bind(error)
        .bind(run_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a run by its primary key, scoped to the organization.
    pub async fn find_by_id(
        pool: &PgPool,
        org_id: DbId,
        run_id: DbId,
    ) -> Result<Option<WorkflowRun>, sqlx::Error> {
        let query = format!("SELECT {RUN_COLUMNS} FROM workflow_runs WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, WorkflowRun>(&query)
            .bind(run_id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// List a workflow's runs newest-first with optional status filtering.
    ///
    /// Returns the page and the total matching count. Limit is clamped to
    /// [`MAX_RUN_LIMIT`].
    pub async fn list_for_workflow(
        pool: &PgPool,
        org_id: DbId,
        workflow_id: DbId,
        filter: &RunFilter,
    ) -> Result<(Vec<WorkflowRun>, i64), sqlx::Error> {
        let limit = clamp_limit(filter.limit, DEFAULT_RUN_LIMIT, MAX_RUN_LIMIT);
        let offset = clamp_offset(filter.offset);

        let (rows, total) = if let Some(ref status) = filter.status {
            let query = format!(
                "SELECT {RUN_COLUMNS} FROM workflow_runs \
                 WHERE workflow_id = $1 AND org_id = $2 AND status = $3 \
                 ORDER BY started_at DESC, id DESC LIMIT $4 OFFSET $5"
            );
            let rows = sqlx::query_as::<_, WorkflowRun>(&query)
                .bind(workflow_id)
                .bind(org_id)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM workflow_runs \
                 WHERE workflow_id = $1 AND org_id = $2 AND status = $3",
            )
            .bind(workflow_id)
            .bind(org_id)
            .bind(status)
            .fetch_one(pool)
            .await?;
            (rows, total)
        } else {
            let query = format!(
                "SELECT {RUN_COLUMNS} FROM workflow_runs \
                 WHERE workflow_id = $1 AND org_id = $2 \
                 ORDER BY started_at DESC, id DESC LIMIT $3 OFFSET $4"
            );
            let rows = sqlx::query_as::<_, WorkflowRun>(&query)
                .bind(workflow_id)
                .bind(org_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM workflow_runs WHERE workflow_id = $1 AND org_id = $2",
            )
            .bind(workflow_id)
            .bind(org_id)
            .fetch_one(pool)
            .await?;
            (rows, total)
        };

        Ok((rows, total))
    }

    /// Append one step result to a run, returning the created row.
    pub async fn append_step_result(
        pool: &PgPool,
        run_id: DbId,
        result: &NewStepResult,
    ) -> Result<StepResult, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_step_results
                (run_id, step_id, step_order, action_type, status, output, error,
                 started_at, ended_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {RESULT_COLUMNS}"
        );
        sqlx::query_as::<_, StepResult>(&query)
            .bind(run_id)
            .bind(result.step_id)
            .bind(result.step_order)
            .bind(&result.action_type)
            .bind(&result.status)
            .bind(&result.output)
            .bind(&result.error)
            .bind(result.started_at)
            .bind(result.ended_at)
            .fetch_one(pool)
            .await
    }

    /// List a run's step results in execution order.
    pub async fn list_step_results(
        pool: &PgPool,
        run_id: DbId,
    ) -> Result<Vec<StepResult>, sqlx::Error> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} FROM workflow_step_results \
             WHERE run_id = $1 ORDER BY step_order ASC, id ASC"
        );
        sqlx::query_as::<_, StepResult>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }
}
