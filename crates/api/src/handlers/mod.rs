pub mod admin_templates;
pub mod dev_auth;
pub mod images;
pub mod template_assets;
pub mod templates;
pub mod users;
