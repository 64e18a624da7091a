//! Opportunity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowline_core::types::{DbId, Timestamp};

/// An opportunity row from the `opportunities` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: DbId,
    pub org_id: DbId,
    pub contact_id: Option<DbId>,
    pub name: String,
    pub stage: String,
    pub value_cents: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for partially updating an opportunity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOpportunity {
    pub name: Option<String>,
    pub stage: Option<String>,
    pub value_cents: Option<i64>,
}
