//! Repository for the `tasks` table.

use sqlx::PgPool;

use flowline_core::types::DbId;

use crate::models::task::{CreateTask, Task, TaskFilter, UpdateTask};

/// Column list for task queries.
const COLUMNS: &str = "id, org_id, project_id, title, status, assignee_id, tags, \
    created_at, updated_at";

/// Provides CRUD operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new task, returning the created row.
    pub async fn create(
        pool: &PgPool,
        org_id: DbId,
        input: &CreateTask,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (org_id, project_id, title, status, assignee_id, tags)
             VALUES ($1, $2, $3, COALESCE($4, 'open'), $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(org_id)
            .bind(input.project_id)
            .bind(&input.title)
            .bind(&input.status)
            .bind(input.assignee_id)
            .bind(&input.tags)
            .fetch_one(pool)
            .await
    }

    /// Find a task by its primary key, scoped to the organization.
    pub async fn find_by_id(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Update an existing task. Returns the updated row, or `None` if not
    /// found in the organization.
    pub async fn update(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
        input: &UpdateTask,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET
                title       = COALESCE($1, title),
                status      = COALESCE($2, status),
                assignee_id = COALESCE($3, assignee_id),
                project_id  = COALESCE($4, project_id),
                updated_at  = now()
             WHERE id = $5 AND org_id = $6
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(&input.title)
            .bind(&input.status)
            .bind(input.assignee_id)
            .bind(input.project_id)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply one set of field updates to every task matching the filter.
    ///
    /// Returns the number of tasks updated. An empty `set` is a no-op.
    pub async fn bulk_update(
        pool: &PgPool,
        org_id: DbId,
        filter: &TaskFilter,
        set: &UpdateTask,
    ) -> Result<u64, sqlx::Error> {
        if set.title.is_none()
            && set.status.is_none()
            && set.assignee_id.is_none()
            && set.project_id.is_none()
        {
            return Ok(0);
        }

        let mut conditions: Vec<String> = vec!["org_id = $1".to_string()];
        let mut param_idx: usize = 1;

        if filter.status.is_some() {
            param_idx += 1;
            conditions.push(format!("status = ${param_idx}"));
        }
        if filter.project_id.is_some() {
            param_idx += 1;
            conditions.push(format!("project_id = ${param_idx}"));
        }
        if filter.tag.is_some() {
            param_idx += 1;
            conditions.push(format!("${param_idx} = ANY(tags)"));
        }

        let set_title = param_idx + 1;
        let set_status = param_idx + 2;
        let set_assignee = param_idx + 3;
        let set_project = param_idx + 4;

        let query = format!(
            "UPDATE tasks SET
                title       = COALESCE(${set_title}, title),
                status      = COALESCE(${set_status}, status),
                assignee_id = COALESCE(${set_assignee}, assignee_id),
                project_id  = COALESCE(${set_project}, project_id),
                updated_at  = now()
             WHERE {}",
            conditions.join(" AND ")
        );

        let mut q = sqlx::query(&query).bind(org_id);

        if let Some(ref status) = filter.status {
            q = q.bind(status);
        }
        if let Some(project_id) = filter.project_id {
            q = q.bind(project_id);
        }
        if let Some(ref tag) = filter.tag {
            q = q.bind(tag);
        }

        q = q
            .bind(&set.title)
            .bind(&set.status)
            .bind(set.assignee_id)
            .bind(set.project_id);

        let result = q.execute(pool).await?;
        Ok(result.rows_affected())
    }
}
