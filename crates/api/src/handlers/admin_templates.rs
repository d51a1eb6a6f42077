//! Handlers for the admin template lifecycle.
//!
//! All endpoints require the admin role via [`RequireAdmin`].

use axum::extract::State;
use axum::response::IntoResponse;
use imageai_core::error::CoreError;
use imageai_core::template::{validate_create, validate_update, TemplateFields};
use imageai_db::models::template::{
    AdminTemplateList, CreateTemplate, PublishOutcome, TemplateListParams, UpdateTemplate,
};
use imageai_db::repositories::TemplateRepo;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::rbac::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(crate) fn template_not_found(slug: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Template",
        key: slug.to_string(),
    })
}

/// GET /api/v1/admin/templates
///
/// Filter with `q`, `tags`, `status`, `visibility`; order with `sort`;
/// page with `limit`/`offset`.
pub async fn list_templates(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TemplateListParams>,
) -> AppResult<impl IntoResponse> {
    let templates = TemplateRepo::list_admin(&state.pool, &params).await?;
    Ok(ApiResponse::ok(AdminTemplateList { templates }))
}

/// POST /api/v1/admin/templates
///
/// Any initial status is accepted; the thumbnail gate only applies to the
/// explicit publish action.
pub async fn create_template(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateTemplate>,
) -> AppResult<impl IntoResponse> {
    let valid = validate_create(
        &input.slug,
        TemplateFields {
            name: &input.name,
            status: &input.status,
            visibility: &input.visibility,
            tags: &input.tags,
        },
    )?;

    let template = TemplateRepo::create(
        &state.pool,
        &input.slug,
        &valid,
        input.description.as_deref(),
        input.thumbnail_url.as_deref(),
    )
    .await?;

    tracing::info!(slug = %template.slug, status = %template.status, uid = %admin.uid, "Template created");

    Ok(ApiResponse::created(template))
}

/// GET /api/v1/admin/templates/{slug}
pub async fn get_template(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<impl IntoResponse> {
    let template = TemplateRepo::find_admin_by_slug(&state.pool, &slug)
        .await?
        .ok_or_else(|| template_not_found(&slug))?;
    Ok(ApiResponse::ok(template))
}

/// PUT /api/v1/admin/templates/{slug}
///
/// Full replace of the mutable fields; tags are replaced, not merged. A
/// stored thumbnail file displaced by `thumbnail_url` is removed after commit.
pub async fn update_template(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    ApiJson(input): ApiJson<UpdateTemplate>,
) -> AppResult<impl IntoResponse> {
    let valid = validate_update(TemplateFields {
        name: &input.name,
        status: &input.status,
        visibility: &input.visibility,
        tags: &input.tags,
    })?;

    let updated = TemplateRepo::update(
        &state.pool,
        &slug,
        &valid,
        input.description.as_deref(),
        input.thumbnail_url.as_deref(),
    )
    .await?
    .ok_or_else(|| template_not_found(&slug))?;

    tracing::info!(slug = %slug, status = %updated.template.status, uid = %admin.uid, "Template updated");

    if let Some(url) = &updated.replaced_thumbnail {
        crate::handlers::template_assets::remove_blob(&state, url).await;
    }

    Ok(ApiResponse::ok(updated.template))
}

/// DELETE /api/v1/admin/templates/{slug}
///
/// Asset rows cascade with the template; their stored files are removed
/// afterwards on a best-effort basis.
pub async fn delete_template(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<impl IntoResponse> {
    let urls = TemplateRepo::delete(&state.pool, &slug)
        .await?
        .ok_or_else(|| template_not_found(&slug))?;

    tracing::info!(slug = %slug, assets = urls.len(), uid = %admin.uid, "Template deleted");

    for url in &urls {
        crate::handlers::template_assets::remove_blob(&state, url).await;
    }

    Ok(ApiResponse::empty())
}

/// POST /api/v1/admin/templates/{slug}/publish
///
/// Requires a thumbnail asset with a non-empty URL. `published_at` is
/// refreshed on every successful publish.
pub async fn publish_template(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<impl IntoResponse> {
    match TemplateRepo::publish(&state.pool, &slug).await? {
        PublishOutcome::Published(template) => {
            tracing::info!(slug = %slug, uid = %admin.uid, "Template published");
            Ok(ApiResponse::ok(template))
        }
        PublishOutcome::NotFound => Err(template_not_found(&slug)),
        PublishOutcome::ThumbnailRequired => {
            tracing::debug!(slug = %slug, "Publish rejected: no thumbnail");
            Err(AppError::Core(CoreError::ThumbnailRequired { slug }))
        }
    }
}

/// POST /api/v1/admin/templates/{slug}/unpublish
pub async fn unpublish_template(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<impl IntoResponse> {
    let template = TemplateRepo::unpublish(&state.pool, &slug)
        .await?
        .ok_or_else(|| template_not_found(&slug))?;

    tracing::info!(slug = %slug, uid = %admin.uid, "Template unpublished");

    Ok(ApiResponse::ok(template))
}
