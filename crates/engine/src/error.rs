//! Step execution error type.

use flowline_core::types::DbId;

/// Error produced by a step executor.
///
/// These are recorded on the step result and drive the run's
/// required/optional failure handling; they never propagate as panics out
/// of the run loop.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The step's configuration is unusable (missing/mis-typed fields,
    /// unknown action type, template errors).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A referenced record does not exist in the workflow's organization.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// The operation conflicts with existing state (e.g. an opportunity
    /// that already has a project).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external service call failed (network, non-2xx, provider error).
    #[error("External call failed: {0}")]
    External(String),

    /// The step exceeded its execution timeout.
    #[error("Step timed out after {0} seconds")]
    Timeout(u64),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
