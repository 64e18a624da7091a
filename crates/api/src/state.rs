use std::sync::Arc;

use flowline_engine::WorkflowRunner;
use flowline_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: flowline_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Run orchestrator; webhook and test-run handlers detach runs on it.
    pub runner: Arc<WorkflowRunner>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<EventBus>,
}
