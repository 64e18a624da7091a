//! Repository for the `notifications` table.

use sqlx::PgPool;

use flowline_core::types::DbId;

use crate::models::notification::Notification;

/// Column list for notification queries.
const COLUMNS: &str = "id, org_id, user_id, channel, title, body, is_read, created_at";

/// Provides write/read access to user notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a new notification row, returning the created row.
    pub async fn create(
        pool: &PgPool,
        org_id: DbId,
        user_id: DbId,
        channel: &str,
        title: &str,
        body: Option<&str>,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (org_id, user_id, channel, title, body)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(org_id)
            .bind(user_id)
            .bind(channel)
            .bind(title)
            .bind(body)
            .fetch_one(pool)
            .await
    }

    /// Count a user's unread notifications.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
