//! Public template listing.

use axum::extract::State;
use axum::response::IntoResponse;
use imageai_db::models::template::{PublicTemplateList, TemplateListParams};
use imageai_db::repositories::TemplateRepo;

use crate::error::AppResult;
use crate::extract::ApiQuery;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/templates
///
/// Published, public templates only. Accepts `q`, `tags`, `sort`
/// (`newest` by default, or `popular`), `limit` and `offset`; `status`
/// and `visibility` are ignored.
pub async fn list_public_templates(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TemplateListParams>,
) -> AppResult<impl IntoResponse> {
    let templates = TemplateRepo::list_public(&state.pool, &params).await?;
    Ok(ApiResponse::ok(PublicTemplateList { templates }))
}
