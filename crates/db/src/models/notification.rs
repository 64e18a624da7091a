//! Notification model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowline_core::types::{DbId, Timestamp};

/// Delivery channel for in-app notifications.
pub const CHANNEL_INAPP: &str = "inapp";

/// Delivery channel for push notifications.
pub const CHANNEL_PUSH: &str = "push";

/// A notification row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: DbId,
    pub org_id: DbId,
    pub user_id: DbId,
    pub channel: String,
    pub title: String,
    pub body: Option<String>,
    pub is_read: bool,
    pub created_at: Timestamp,
}
