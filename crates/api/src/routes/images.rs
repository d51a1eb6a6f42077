use axum::routing::post;
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/images`.
///
/// ```text
/// POST   /process           -> process_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/process", post(images::process_image))
}
