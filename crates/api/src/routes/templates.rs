use axum::routing::get;
use axum::Router;

use crate::handlers::templates;
use crate::state::AppState;

/// Public listing mounted at `/templates`.
///
/// ```text
/// GET    /                  -> list_public_templates
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(templates::list_public_templates))
}
