//! Row structs and request DTOs.

pub mod asset;
pub mod template;
pub mod template_version;
pub mod user_profile;
