//! Task model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowline_core::types::{DbId, Timestamp};

/// A task row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Task {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: Option<DbId>,
    pub title: String,
    pub status: String,
    pub assignee_id: Option<DbId>,
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub project_id: Option<DbId>,
    pub status: Option<String>,
    pub assignee_id: Option<DbId>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for partially updating a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub status: Option<String>,
    pub assignee_id: Option<DbId>,
    pub project_id: Option<DbId>,
}

/// Selection filter for bulk task updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub project_id: Option<DbId>,
    pub tag: Option<String>,
}
