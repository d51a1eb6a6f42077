//! Template asset models and DTOs.

use imageai_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `template_assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateAsset {
    pub id: DbId,
    #[serde(skip_serializing)]
    pub template_id: DbId,
    pub kind: String,
    pub url: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateAssetList {
    pub assets: Vec<TemplateAsset>,
}

/// Body of `PUT /admin/templates/{slug}/assets/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplateAsset {
    pub kind: Option<String>,
    pub sort_order: Option<i32>,
}
