//! Template models and DTOs.

use imageai_core::types::{DbId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// Admin view of a template. `id` mirrors the slug.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdminTemplate {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: String,
    pub visibility: String,
    pub published_at: Option<Timestamp>,
    pub usage_count: i32,
    pub updated_at: Timestamp,
    pub tags: Vec<String>,
}

/// Public listing entry. Never carries the prompt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PublicTemplate {
    pub id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<Timestamp>,
    pub usage_count: i32,
}

/// Prompt and model settings resolved through `current_version_id`, used by
/// image processing.
#[derive(Debug, Clone, FromRow)]
pub struct TemplatePrompt {
    pub template_id: DbId,
    pub slug: String,
    pub prompt_template: String,
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminTemplateList {
    pub templates: Vec<AdminTemplate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicTemplateList {
    pub templates: Vec<PublicTemplate>,
}

// ---------------------------------------------------------------------------
// Write DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /admin/templates`.
///
/// Every field defaults so that missing fields surface as validation errors
/// naming the field rather than as a generic decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTemplate {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub visibility: String,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
}

/// Body of `PUT /admin/templates/{slug}`. Full replace; the slug is immutable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub visibility: String,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Query string accepted by both listings. `status` and `visibility` are
/// ignored by the public listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateListParams {
    pub q: Option<String>,
    /// CSV of tag slugs; a template matches if it carries any of them.
    pub tags: Option<String>,
    pub status: Option<String>,
    pub visibility: Option<String>,
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub offset: Option<i64>,
}

/// Unparseable paging values count as absent and fall back to the defaults.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

/// A full-replace update, plus the thumbnail URL it displaced, if any.
#[derive(Debug, Clone)]
pub struct UpdatedTemplate {
    pub template: AdminTemplate,
    pub replaced_thumbnail: Option<String>,
}

/// Outcome of the gated publish action.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    Published(AdminTemplate),
    NotFound,
    ThumbnailRequired,
}
