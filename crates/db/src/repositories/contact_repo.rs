//! Repository for the `contacts` table.

use sqlx::PgPool;

use flowline_core::types::DbId;

use crate::models::contact::{Contact, CreateContact, UpdateContact};

/// Column list for contact queries.
const COLUMNS: &str = "id, org_id, name, email, tags, created_at, updated_at";

/// Provides CRUD and tag operations for contacts.
pub struct ContactRepo;

impl ContactRepo {
    /// Insert a new contact, returning the created row.
    pub async fn create(
        pool: &PgPool,
        org_id: DbId,
        input: &CreateContact,
    ) -> Result<Contact, sqlx::Error> {
        let query = format!(
            "INSERT INTO contacts (org_id, name, email, tags)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(org_id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.tags)
            .fetch_one(pool)
            .await
    }

    /// Find a contact by its primary key, scoped to the organization.
    pub async fn find_by_id(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
    ) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contacts WHERE id = $1 AND org_id = $2");
        sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Update an existing contact. Returns the updated row, or `None` if
    /// not found in the organization.
    pub async fn update(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
        input: &UpdateContact,
    ) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!(
            "UPDATE contacts SET
                name       = COALESCE($1, name),
                email      = COALESCE($2, email),
                updated_at = now()
             WHERE id = $3 AND org_id = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Add a tag to a contact (idempotent). Returns the updated row, or
    /// `None` if not found.
    pub async fn add_tag(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
        tag: &str,
    ) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!(
            "UPDATE contacts SET
                tags = CASE WHEN $1 = ANY(tags) THEN tags ELSE array_append(tags, $1) END,
                updated_at = now()
             WHERE id = $2 AND org_id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(tag)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }

    /// Remove a tag from a contact (no-op if absent). Returns the updated
    /// row, or `None` if not found.
    pub async fn remove_tag(
        pool: &PgPool,
        org_id: DbId,
        id: DbId,
        tag: &str,
    ) -> Result<Option<Contact>, sqlx::Error> {
        let query = format!(
            "UPDATE contacts SET
                tags = array_remove(tags, $1),
                updated_at = now()
             WHERE id = $2 AND org_id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contact>(&query)
            .bind(tag)
            .bind(id)
            .bind(org_id)
            .fetch_optional(pool)
            .await
    }
}
