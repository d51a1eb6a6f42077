//! Tag vocabulary and template-tag links.

use imageai_core::tags::{normalize_tags, TagMode};
use imageai_core::types::DbId;
use sqlx::PgPool;

/// Provides tag reconciliation for template writes.
pub struct TagRepo;

impl TagRepo {
    /// Bring a template's tag links in line with `tags`.
    ///
    /// Tags are upserted by slug (the display name is refreshed to the slug)
    /// and linked with `ON CONFLICT DO NOTHING`, so repeating the call is a
    /// no-op. In [`TagMode::Replace`] every existing link is dropped first.
    /// Runs inside the caller's transaction.
    pub async fn reconcile(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: DbId,
        tags: &[String],
        mode: TagMode,
    ) -> Result<(), sqlx::Error> {
        if mode == TagMode::Replace {
            sqlx::query("DELETE FROM template_tags WHERE template_id = $1")
                .bind(template_id)
                .execute(&mut **tx)
                .await?;
        }

        for slug in normalize_tags(tags) {
            let tag_id: DbId = sqlx::query_scalar(
                "INSERT INTO tags (slug, name) VALUES ($1, $1) \
                 ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name \
                 RETURNING id",
            )
            .bind(&slug)
            .fetch_one(&mut **tx)
            .await?;

            sqlx::query(
                "INSERT INTO template_tags (template_id, tag_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(template_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Tag slugs linked to a template, alphabetically.
    pub async fn list_for_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT tg.slug FROM template_tags tt \
             JOIN tags tg ON tg.id = tt.tag_id \
             WHERE tt.template_id = $1 \
             ORDER BY tg.slug",
        )
        .bind(template_id)
        .fetch_all(pool)
        .await
    }
}
