//! Route definitions for template administration.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::template_assets::UPLOAD_BODY_LIMIT;
use crate::handlers::{admin_templates, template_assets};
use crate::state::AppState;

/// Routes mounted at `/admin/templates`.
///
/// ```text
/// GET    /                        -> list_templates
/// POST   /                        -> create_template
/// GET    /{slug}                  -> get_template
/// PUT    /{slug}                  -> update_template
/// DELETE /{slug}                  -> delete_template
/// POST   /{slug}/publish          -> publish_template
/// POST   /{slug}/unpublish        -> unpublish_template
/// GET    /{slug}/assets           -> list_assets
/// POST   /{slug}/assets           -> upload_asset (multipart)
/// PUT    /{slug}/assets/{id}      -> update_asset
/// DELETE /{slug}/assets/{id}      -> delete_asset
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(admin_templates::list_templates).post(admin_templates::create_template),
        )
        .route(
            "/{slug}",
            get(admin_templates::get_template)
                .put(admin_templates::update_template)
                .delete(admin_templates::delete_template),
        )
        .route("/{slug}/publish", post(admin_templates::publish_template))
        .route("/{slug}/unpublish", post(admin_templates::unpublish_template))
        .route(
            "/{slug}/assets",
            get(template_assets::list_assets)
                .post(template_assets::upload_asset)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/{slug}/assets/{id}",
            put(template_assets::update_asset).delete(template_assets::delete_asset),
        )
}
