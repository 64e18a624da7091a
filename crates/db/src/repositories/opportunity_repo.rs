//! Repository for the `opportunities` table.

use sqlx::PgPool;

use flowline_core::types::DbId;

use crate::models::opportunity::{Opportunity, UpdateOpportunity};

/// Column list for opportunity queries.
const COLUMNS: &str = "id, org_id, contact_id, name, stage, value_cents, created_at, updated_at";

/// Provides read/update operations for opportunities.
pub struct OpportunityRepo;

impl OpportunityRepo {
    /// Find an opportunity by its primary key, scoped to the organization.
    pub async fn find_by_id(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<Opportunity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM opportunities WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, Opportunity>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Update an existing opportunity. Returns the updated row, or `None`
    /// if not found in the organization.
    pub async fn update(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
        input: &UpdateOpportunity,
    ) -> Result<Option<Opportunity>, sqlx::Error> {
        let query = format!(
            "UPDATE opportunities SET
                name        = COALESCE($1, name),
                stage       = COALESCE($2, stage),
                value_cents = COALESCE($3, value_cents),
                updated_at  = now()
             WHERE id = $4 AND org_id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Opportunity>(&query)
            .bind(&input.name)
            .bind(&input.stage)
            .bind(input.value_cents)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }
}
