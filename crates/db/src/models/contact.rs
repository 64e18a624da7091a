//! Contact model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowline_core::types::{DbId, Timestamp};

/// A contact row from the `contacts` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contact {
    pub id: DbId,
    pub org_id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a contact.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContact {
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for partially updating a contact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContact {
    pub name: Option<String>,
    pub email: Option<String>,
}
