//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Query parameters for the run-history endpoint
/// (`?status=&limit=&offset=`). Values are clamped in the repository layer.
#[derive(Debug, Deserialize)]
pub struct RunListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for list endpoints that support an `include_inactive`
/// flag.
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}
