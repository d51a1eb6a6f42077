use axum::routing::{get, post};
use axum::Router;

use crate::handlers::dev_auth;
use crate::state::AppState;

/// Development login routes mounted at `/dev` when dev auth is enabled.
///
/// ```text
/// POST   /login             -> login
/// GET    /whoami            -> whoami
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(dev_auth::login))
        .route("/whoami", get(dev_auth::whoami))
}
