//! Prompt versions. Admin CRUD never writes these; the seeder does.

use imageai_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `template_versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateVersion {
    pub id: DbId,
    pub template_id: DbId,
    pub version: i32,
    pub prompt_template: String,
    pub model_name: Option<String>,
    pub model_parameters: serde_json::Value,
    pub created_at: Timestamp,
}

/// Input for [`TemplateVersionRepo::upsert_current`](crate::repositories::TemplateVersionRepo::upsert_current).
#[derive(Debug, Clone)]
pub struct UpsertTemplateVersion {
    pub version: i32,
    pub prompt_template: String,
    pub model_name: Option<String>,
    pub model_parameters: serde_json::Value,
}
