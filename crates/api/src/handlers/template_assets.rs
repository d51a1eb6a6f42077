//! Handlers for a template's assets (thumbnail, cover, preview images).
//!
//! Every operation is scoped to an existing template slug. Requires admin.

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use imageai_core::asset::{check_asset_size, upload_filename, AssetKind, ImageFormat, MAX_ASSET_BYTES};
use imageai_core::error::CoreError;
use imageai_core::types::DbId;
use imageai_db::models::asset::{TemplateAssetList, UpdateTemplateAsset};
use imageai_db::repositories::{TemplateAssetRepo, TemplateRepo};

use super::admin_templates::template_not_found;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::rbac::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Request body ceiling for the upload route: one asset plus room for the
/// multipart framing and text fields.
pub const UPLOAD_BODY_LIMIT: usize = MAX_ASSET_BYTES + 1024 * 1024;

fn asset_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Asset",
        key: id.to_string(),
    })
}

/// Delete the stored bytes behind an asset URL. Failures are logged, never
/// returned: the row is already gone.
pub(crate) async fn remove_blob(state: &AppState, url: &str) {
    match state.assets.delete(url).await {
        Ok(true) => tracing::debug!(url, "Asset file removed"),
        Ok(false) => tracing::debug!(url, "No stored file to remove"),
        Err(e) => tracing::warn!(url, error = %e, "Failed to remove asset file"),
    }
}

/// GET /api/v1/admin/templates/{slug}/assets
pub async fn list_assets(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<impl IntoResponse> {
    let assets = TemplateAssetRepo::list(&state.pool, &slug)
        .await?
        .ok_or_else(|| template_not_found(&slug))?;
    Ok(ApiResponse::ok(TemplateAssetList { assets }))
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

struct UploadedFile {
    name: Option<String>,
    bytes: Bytes,
}

#[derive(Default)]
struct UploadForm {
    kind: Option<String>,
    sort_order: Option<String>,
    file: Option<UploadedFile>,
}

async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "kind" => form.kind = Some(field.text().await?),
            "sort_order" => form.sort_order = Some(field.text().await?),
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                form.file = Some(UploadedFile {
                    name: file_name,
                    bytes: field.bytes().await?,
                });
            }
            _ => {}
        }
    }
    Ok(form)
}

fn parse_sort_order(raw: Option<&str>) -> Result<Option<i32>, CoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| CoreError::invalid_field("sort_order", "sort_order must be an integer")),
    }
}

/// POST /api/v1/admin/templates/{slug}/assets
///
/// Multipart fields: `kind` (required), `file` (required, JPEG or PNG up
/// to 12 MiB), `sort_order` (optional). The content type is sniffed from
/// the bytes; the declared one is ignored.
pub async fn upload_asset(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    if TemplateRepo::find_id_by_slug(&state.pool, &slug).await?.is_none() {
        return Err(template_not_found(&slug));
    }

    let form = read_upload_form(multipart?).await?;

    let kind: AssetKind = form.kind.as_deref().unwrap_or_default().parse()?;
    let file = form.file.ok_or_else(|| CoreError::InvalidRequest {
        fields: vec!["file".into()],
        message: "file is required".into(),
    })?;
    check_asset_size(file.bytes.len())?;
    let format = ImageFormat::sniff(&file.bytes)?;
    let sort_order = parse_sort_order(form.sort_order.as_deref())?;

    let filename = upload_filename(file.name.as_deref(), format, chrono::Utc::now());
    let url = state
        .assets
        .save(&format!("templates/{slug}"), &filename, &file.bytes)
        .await?;

    let Some(asset) = TemplateAssetRepo::insert(&state.pool, &slug, kind, &url, sort_order).await?
    else {
        // Template deleted between the existence check and the insert.
        remove_blob(&state, &url).await;
        return Err(template_not_found(&slug));
    };

    tracing::info!(
        slug = %slug,
        asset_id = asset.id,
        kind = %kind,
        size = file.bytes.len(),
        uid = %admin.uid,
        "Template asset uploaded",
    );

    Ok(ApiResponse::created(asset))
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

/// PUT /api/v1/admin/templates/{slug}/assets/{id}
///
/// Body `{kind?, sort_order?}`. Making an asset the thumbnail demotes the
/// previous one to `preview`.
pub async fn update_asset(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath((slug, asset_id)): ApiPath<(String, DbId)>,
    ApiJson(input): ApiJson<UpdateTemplateAsset>,
) -> AppResult<impl IntoResponse> {
    let kind = input
        .kind
        .as_deref()
        .map(str::parse::<AssetKind>)
        .transpose()?;

    let asset = TemplateAssetRepo::update(&state.pool, &slug, asset_id, kind, input.sort_order)
        .await?
        .ok_or_else(|| asset_not_found(asset_id))?;

    tracing::info!(slug = %slug, asset_id, uid = %admin.uid, "Template asset updated");

    Ok(ApiResponse::ok(asset))
}

/// DELETE /api/v1/admin/templates/{slug}/assets/{id}
pub async fn delete_asset(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath((slug, asset_id)): ApiPath<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let asset = TemplateAssetRepo::delete(&state.pool, &slug, asset_id)
        .await?
        .ok_or_else(|| asset_not_found(asset_id))?;

    tracing::info!(slug = %slug, asset_id, uid = %admin.uid, "Template asset deleted");

    remove_blob(&state, &asset.url).await;

    Ok(ApiResponse::empty())
}
