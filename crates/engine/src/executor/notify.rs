//! Notification step executors (`send_notification`, `send_push`).
//!
//! Both insert a notification row for the target user and publish a
//! `notification.created` event; push notifications only differ in channel.
//! The event publish is fire-and-forget.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use flowline_core::workflow::ActionType;
use flowline_db::models::notification::{CHANNEL_INAPP, CHANNEL_PUSH};
use flowline_db::repositories::{NotificationRepo, UserRepo};
use flowline_db::DbPool;
use flowline_events::{DomainEvent, EventBus};

use super::{StepContext, StepExecutor};
use crate::error::ExecError;

/// Creates a notification row on the configured channel.
pub struct NotificationExecutor {
    pool: DbPool,
    bus: Arc<EventBus>,
    action: ActionType,
    channel: &'static str,
}

impl NotificationExecutor {
    /// In-app notification executor (`send_notification`).
    pub fn inapp(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            bus,
            action: ActionType::SendNotification,
            channel: CHANNEL_INAPP,
        }
    }

    /// Push notification executor (`send_push`).
    pub fn push(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            bus,
            action: ActionType::SendPush,
            channel: CHANNEL_PUSH,
        }
    }
}

#[async_trait]
impl StepExecutor for NotificationExecutor {
    fn action_type(&self) -> ActionType {
        self.action
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> Result<Value, ExecError> {
        let user_id = ctx.id_field("user_id")?;
        let title = ctx.str_field("title")?;
        let body = ctx.opt_str_field("body");

        // The target user must belong to the run's organization.
        UserRepo::find_by_id(&self.pool, ctx.org_id, user_id)
            .await?
            .ok_or(ExecError::NotFound {
                entity: "User",
                id: user_id,
            })?;

        let notification = NotificationRepo::create(
            &self.pool,
            ctx.org_id,
            user_id,
            self.channel,
            title,
            body,
        )
        .await?;

        self.bus.publish(
            DomainEvent::new("notification.created", ctx.org_id)
                .with_source("notification", notification.id)
                .with_payload(json!({
                    "user_id": user_id,
                    "channel": self.channel,
                    "title": title,
                })),
        );

        Ok(json!({
            "notification_id": notification.id,
            "channel": self.channel,
        }))
    }
}
