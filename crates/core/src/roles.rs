//! Well-known role name constants.
//!
//! Roles are derived from the verified identity (custom claim or admin
//! email allow-list); they are not stored in the database.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
