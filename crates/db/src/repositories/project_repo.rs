//! Repository for the `projects` and `project_templates` tables.

use sqlx::PgPool;

use flowline_core::types::DbId;

use crate::models::project::{CreateProject, Project, ProjectTemplate};

/// Column list for project queries.
const COLUMNS: &str = "id, org_id, name, status, opportunity_id, created_at, updated_at";

/// Column list for template queries.
const TEMPLATE_COLUMNS: &str = "id, org_id, name, task_titles, created_at, updated_at";

/// Provides CRUD operations for projects and read access to templates.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    pub async fn create(
        pool: &PgPool,
        org_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (org_id, name, status, opportunity_id)
             VALUES ($1, $2, COALESCE($3, 'active'), $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(org_id)
            .bind(&input.name)
            .bind(&input.status)
            .bind(input.opportunity_id)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its primary key, scoped to the organization.
    pub async fn find_by_id(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the project created from a given opportunity, if any.
    ///
    /// Used to detect already-converted opportunities.
    pub async fn find_by_opportunity(
        pool: &PgPool,
        org_id: DbId,
        opportunity_id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM projects WHERE opportunity_id = $1 AND org_id = $2");
        sqlx::query_as::<_, Project>(&query)
            .bind(opportunity_id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a project template by its primary key, scoped to the
    /// organization.
    pub async fn find_template_by_id(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<ProjectTemplate>, sqlx::Error> {
        let query =
            format!("SELECT {TEMPLATE_COLUMNS} FROM project_templates WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, ProjectTemplate>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }
}
