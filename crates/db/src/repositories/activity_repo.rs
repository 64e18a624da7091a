//! Repository for the `activities` table.

use sqlx::PgPool;

use flowline_core::types::DbId;

use crate::models::activity::Activity;

/// Column list for activity queries.
const COLUMNS: &str = "id, org_id, entity_type, entity_id, kind, note, created_at";

/// Provides write/read access to the activity audit trail.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Insert a new activity row, returning the created row.
    pub async fn create(
        pool: &PgPool,
        org_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        kind: &str,
        note: Option<&str>,
    ) -> Result<Activity, sqlx::Error> {
        let query = format!(
            "INSERT INTO activities (org_id, entity_type, entity_id, kind, note)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(org_id)
            .bind(entity_type)
            .bind(entity_id)
            .bind(kind)
            .bind(note)
            .fetch_one(pool)
            .await
    }

    /// List recent activity for an entity, newest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        org_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        limit: i64,
    ) -> Result<Vec<Activity>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activities \
             WHERE org_id = $1 AND entity_type = $2 AND entity_id = $3 \
             ORDER BY created_at DESC LIMIT $4"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(org_id)
            .bind(entity_type)
            .bind(entity_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
