//! Project and project-template models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowline_core::types::{DbId, Timestamp};

/// A project row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: DbId,
    pub org_id: DbId,
    pub name: String,
    pub status: String,
    pub opportunity_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A project template row from the `project_templates` table.
///
/// `task_titles` is a JSON array of strings; instantiating the template
/// creates one open task per title.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProjectTemplate {
    pub id: DbId,
    pub org_id: DbId,
    pub name: String,
    pub task_titles: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub status: Option<String>,
    pub opportunity_id: Option<DbId>,
}
