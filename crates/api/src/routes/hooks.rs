//! Route definitions for webhook triggers.
//!
//! ```text
//! POST   /{workflow_id}    trigger_webhook (signature/IP authorized)
//! GET    /{workflow_id}    webhook_info (no side effects)
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::hooks;
use crate::state::AppState;

/// Webhook trigger routes -- mounted at `/hooks`.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{workflow_id}",
        get(hooks::webhook_info).post(hooks::trigger_webhook),
    )
}
