//! Repository for the `users` table.

use sqlx::PgPool;

use flowline_core::types::DbId;

use crate::models::user::User;

/// Column list for user queries.
const COLUMNS: &str = "id, org_id, email, display_name, role, created_at, updated_at";

/// Provides read access to users.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by its primary key, scoped to the organization.
    pub async fn find_by_id(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }
}
