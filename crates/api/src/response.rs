//! Shared response envelope types for API handlers.
//!
//! Authenticated resources use a `{ "data": ... }` envelope; paginated
//! listings add `total` / `limit` / `offset` alongside the page.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Paginated `{ "data": [...], "total", "limit", "offset" }` envelope.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
