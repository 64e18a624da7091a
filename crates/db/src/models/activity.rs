//! Activity (audit trail) model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowline_core::types::{DbId, Timestamp};

/// An activity row from the `activities` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Activity {
    pub id: DbId,
    pub org_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub kind: String,
    pub note: Option<String>,
    pub created_at: Timestamp,
}
