//! Image processing: run a stored image through a template's prompt.

use axum::extract::State;
use axum::response::IntoResponse;
use imageai_core::asset::{upload_filename, ImageFormat};
use imageai_core::error::CoreError;
use imageai_db::repositories::TemplateRepo;
use imageai_genai::GenerateRequest;
use serde::{Deserialize, Serialize};

use super::admin_templates::template_not_found;
use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Blob-store scope generated images are written under.
const PROCESSED_SCOPE: &str = "processed";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessImageRequest {
    /// Template slug.
    pub template_id: String,
    /// Asset URL or store-relative key of the source image.
    pub image_path: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessImageResponse {
    pub processed_image_url: String,
}

/// POST /api/v1/images/process
///
/// Sends the image and the template's current prompt to the image
/// generator, stores the result and counts one use of the template.
pub async fn process_image(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ProcessImageRequest>,
) -> AppResult<impl IntoResponse> {
    let slug = input.template_id.trim();
    let image_path = input.image_path.trim();
    if slug.is_empty() || image_path.is_empty() {
        return Err(CoreError::InvalidRequest {
            fields: vec!["template_id".into(), "image_path".into()],
            message: "template_id and image_path are required".into(),
        }
        .into());
    }

    if !state.assets.exists(image_path).await? {
        return Err(CoreError::NotFound {
            entity: "Image",
            key: image_path.to_string(),
        }
        .into());
    }

    let prompt = TemplateRepo::find_prompt_by_slug(&state.pool, slug)
        .await?
        .ok_or_else(|| template_not_found(slug))?;

    let source = state.assets.read(image_path).await?;
    let source_format = ImageFormat::sniff(&source)?;

    let generated = state
        .generator
        .generate(GenerateRequest {
            prompt: &prompt.prompt_template,
            image: &source,
            mime_type: source_format.mime_type(),
            model: prompt.model_name.as_deref(),
        })
        .await
        .map_err(|e| {
            tracing::error!(slug = %slug, error = %e, "Image generation failed");
            CoreError::Upstream("image generation failed".into())
        })?;

    // Bytes first, then the MIME type the generator reported, then PNG.
    let output_format = ImageFormat::sniff(&generated.bytes)
        .ok()
        .or_else(|| generated.mime_type.as_deref().and_then(ImageFormat::from_mime))
        .unwrap_or(ImageFormat::Png);
    let filename = upload_filename(Some(&prompt.slug), output_format, chrono::Utc::now());
    let url = state
        .processed
        .save(PROCESSED_SCOPE, &filename, &generated.bytes)
        .await?;

    TemplateRepo::increment_usage(&state.pool, prompt.template_id).await?;

    tracing::info!(
        slug = %prompt.slug,
        uid = %user.uid,
        output = %url,
        size = generated.bytes.len(),
        "Image processed",
    );

    Ok(ApiResponse::ok(ProcessImageResponse {
        processed_image_url: url,
    }))
}
