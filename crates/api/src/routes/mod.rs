pub mod admin_templates;
pub mod dev;
pub mod health;
pub mod images;
pub mod templates;
pub mod users;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /admin/templates                           list, create (admin only)
/// /admin/templates/{slug}                    get, update, delete
/// /admin/templates/{slug}/publish            gated publish (POST)
/// /admin/templates/{slug}/unpublish          unpublish (POST)
/// /admin/templates/{slug}/assets             list, upload (GET, POST multipart)
/// /admin/templates/{slug}/assets/{id}        update, delete (PUT, DELETE)
///
/// /templates                                 public listing (auth required)
///
/// /users/register                            register/update profile (POST)
///
/// /images/process                            run image through template (POST)
///
/// /dev/login                                 dev login (POST, dev auth only)
/// /dev/whoami                                current principal (GET, dev auth only)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    let router = Router::new()
        .nest("/admin/templates", admin_templates::router())
        .nest("/templates", templates::router())
        .nest("/users", users::router())
        .nest("/images", images::router());

    if config.auth.dev.is_some() {
        router.nest("/dev", dev::router())
    } else {
        router
    }
}
