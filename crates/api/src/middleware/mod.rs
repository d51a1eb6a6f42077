//! Request extractors and middleware.
//!
//! - [`auth::AuthUser`] -- The caller verified from the `Authorization: Bearer` header.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`envelope::attach_meta`] -- Adds `meta` to every enveloped response.

pub mod auth;
pub mod envelope;
pub mod rbac;
