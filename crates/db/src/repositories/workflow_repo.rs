//! Repository for the `workflows` and `workflow_steps` tables.

use sqlx::PgPool;

use flowline_core::types::DbId;

use crate::models::workflow::{
    CreateWorkflowStep, UpdateWorkflow, Workflow, WorkflowStep,
};

/// Column list for workflow queries.
const WORKFLOW_COLUMNS: &str = "id, org_id, name, description, trigger_type, trigger_config, \
    is_active, created_by, created_at, updated_at";

/// Column list for step queries.
const STEP_COLUMNS: &str = "id, workflow_id, step_order, action_type, action_config, \
    is_required, condition, created_at, updated_at";

/// Provides CRUD operations for workflow definitions and their steps.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// Insert a new workflow, returning the created row. Steps are inserted
    /// separately via [`WorkflowRepo::replace_steps`].
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        pool: &PgPool,
        org_id: DbId,
        name: &str,
        description: Option<&str>,
        trigger_type: &str,
        trigger_config: &serde_json::Value,
        is_active: bool,
        created_by: Option<DbId>,
    ) -> Result<Workflow, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflows
                (org_id, name, description, trigger_type, trigger_config, is_active, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {WORKFLOW_COLUMNS}"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(org_id)
            .bind(name)
            .bind(description)
            .bind(trigger_type)
            .bind(trigger_config)
            .bind(is_active)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a workflow by its primary key, scoped to the organization.
    pub async fn find_by_id(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a workflow by id alone.
    ///
    /// Used by trigger paths (webhook, scheduler) that address the workflow
    /// before any session exists; the returned row carries the org scope for
    /// everything downstream.
    pub async fn find_for_trigger(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1");
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List an organization's workflows, newest first.
    pub async fn list(
        pool: &PgPool,
        org_id: DbId,
        include_inactive: bool,
    ) -> Result<Vec<Workflow>, sqlx::Error> {
        let query = if include_inactive {
            format!(
                "SELECT {WORKFLOW_COLUMNS} FROM workflows \
                 WHERE org_id = $1 ORDER BY created_at DESC"
            )
        } else {
            format!(
                "SELECT {WORKFLOW_COLUMNS} FROM workflows \
                 WHERE org_id = $1 AND is_active ORDER BY created_at DESC"
            )
        };
        sqlx::query_as::<_, Workflow>(&query)
            .bind(org_id)
            .fetch_all(pool)
            .await
    }

    /// List all active workflows with the given trigger type, across
    /// organizations. Used by the schedule ticker and event listener.
    pub async fn list_active_by_trigger(
        pool: &PgPool,
        trigger_type: &str,
    ) -> Result<Vec<Workflow>, sqlx::Error> {
        let query = format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows \
             WHERE trigger_type = $1 AND is_active ORDER BY id"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(trigger_type)
            .fetch_all(pool)
            .await
    }

    /// Update an existing workflow. Returns the updated row, or `None` if
    /// not found in the organization.
    pub async fn update(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
        input: &UpdateWorkflow,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!(
            "UPDATE workflows SET
                name           = COALESCE($1, name),
                description    = COALESCE($2, description),
                trigger_type   = COALESCE($3, trigger_type),
                trigger_config = COALESCE($4, trigger_config),
                updated_at     = now()
             WHERE id = $5 AND org_id = $6
             RETURNING {WORKFLOW_COLUMNS}"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.trigger_type)
            .bind(&input.trigger_config)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Set a workflow's active flag. Returns `true` if a row was updated.
    pub async fn set_active(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
        is_active: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflows SET is_active = $1, updated_at = now() \
             WHERE id = $2 AND org_id = $3",
        )
        .bind(is_active)
        .bind(id)
        .bind(org_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a workflow by its ID. Returns `true` if a row was deleted.
    ///
    /// Callers must check [`WorkflowRepo::run_count`] first; the runs table
    /// references workflows with RESTRICT, so deleting a workflow with
    /// history fails at the database.
    pub async fn delete(pool: &PgPool, org_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1 AND org_id = $2")
            .bind(id)
            .bind(org_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count the runs recorded against a workflow.
    pub async fn run_count(pool: &PgPool, workflow_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM workflow_runs WHERE workflow_id = $1")
            .bind(workflow_id)
            .fetch_one(pool)
            .await
    }

    /// List a workflow's steps ordered by `step_order` ascending.
    pub async fn list_steps(
        pool: &PgPool,
        workflow_id: DbId,
    ) -> Result<Vec<WorkflowStep>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM workflow_steps \
             WHERE workflow_id = $1 ORDER BY step_order ASC, id ASC"
        );
        sqlx::query_as::<_, WorkflowStep>(&query)
            .bind(workflow_id)
            .fetch_all(pool)
            .await
    }

    /// Replace a workflow's step list wholesale inside one transaction.
    pub async fn replace_steps(
        pool: &PgPool,
        workflow_id: DbId,
        steps: &[CreateWorkflowStep],
    ) -> Result<Vec<WorkflowStep>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM workflow_steps WHERE workflow_id = $1")
            .bind(workflow_id)
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO workflow_steps
                (workflow_id, step_order, action_type, action_config, is_required, condition)
             VALUES ($1, $2, $3, $4, COALESCE($5, true), $6)
             RETURNING {STEP_COLUMNS}"
        );

        let mut created = Vec::with_capacity(steps.len());
        for step in steps {
            let row = sqlx::query_as::<_, WorkflowStep>(&insert)
                .bind(workflow_id)
                .bind(step.step_order)
                .bind(&step.action_type)
                .bind(&step.action_config)
                .bind(step.is_required)
                .bind(&step.condition)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }
}
