//! Organization role name constants.
//!
//! Role names are carried in the session token's `role` claim and checked by
//! the API's RBAC extractors. Kept as constants (not an enum) because the
//! platform auth provider owns the role vocabulary.

/// Full administrative access within an organization.
pub const ROLE_ADMIN: &str = "admin";

/// Standard member: may manage workflows but not organization settings.
pub const ROLE_MEMBER: &str = "member";
