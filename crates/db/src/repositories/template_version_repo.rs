use imageai_core::types::DbId;
use sqlx::PgPool;

use crate::models::template_version::{TemplateVersion, UpsertTemplateVersion};

/// Column list for `template_versions` queries.
const COLUMNS: &str = "\
    id, template_id, version, prompt_template, model_name, \
    model_parameters, created_at";

/// Provides access to prompt versions.
pub struct TemplateVersionRepo;

impl TemplateVersionRepo {
    /// Create or overwrite `input.version` for a template and make it the
    /// template's current version.
    pub async fn upsert_current(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: DbId,
        input: &UpsertTemplateVersion,
    ) -> Result<TemplateVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO template_versions \
                (template_id, version, prompt_template, model_name, model_parameters) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (template_id, version) DO UPDATE SET \
                prompt_template = EXCLUDED.prompt_template, \
                model_name = EXCLUDED.model_name, \
                model_parameters = EXCLUDED.model_parameters \
             RETURNING {COLUMNS}"
        );
        let version = sqlx::query_as::<_, TemplateVersion>(&query)
            .bind(template_id)
            .bind(input.version)
            .bind(&input.prompt_template)
            .bind(input.model_name.as_deref())
            .bind(&input.model_parameters)
            .fetch_one(&mut **tx)
            .await?;

        sqlx::query("UPDATE templates SET current_version_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(version.id)
            .bind(template_id)
            .execute(&mut **tx)
            .await?;

        Ok(version)
    }

    /// All versions of a template, newest first.
    pub async fn list_for_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<TemplateVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_versions \
             WHERE template_id = $1 ORDER BY version DESC"
        );
        sqlx::query_as::<_, TemplateVersion>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }
}
