//! Repository for the `template_assets` table.
//!
//! Every operation is scoped to a template slug and returns `None` when the
//! slug (or the asset within it) does not resolve. Mutations lock the owning
//! template row first.

use imageai_core::asset::AssetKind;
use imageai_core::types::DbId;
use sqlx::PgPool;

use super::{lock_template_by_slug, TemplateRepo};
use crate::models::asset::TemplateAsset;

/// Column list for `template_assets` queries.
const COLUMNS: &str = "id, template_id, kind, url, sort_order, created_at";

/// Provides CRUD operations for template assets.
pub struct TemplateAssetRepo;

impl TemplateAssetRepo {
    /// List a template's assets ordered by `(kind, sort_order, id)`.
    pub async fn list(pool: &PgPool, slug: &str) -> Result<Option<Vec<TemplateAsset>>, sqlx::Error> {
        let Some(template_id) = TemplateRepo::find_id_by_slug(pool, slug).await? else {
            return Ok(None);
        };

        let query = format!(
            "SELECT {COLUMNS} FROM template_assets \
             WHERE template_id = $1 \
             ORDER BY kind ASC, sort_order ASC, id ASC"
        );
        let assets = sqlx::query_as::<_, TemplateAsset>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await?;
        Ok(Some(assets))
    }

    /// Insert an asset. Without an explicit `sort_order` it is appended after
    /// the last asset of the same kind. A new thumbnail demotes any existing
    /// one to `preview`.
    pub async fn insert(
        pool: &PgPool,
        slug: &str,
        kind: AssetKind,
        url: &str,
        sort_order: Option<i32>,
    ) -> Result<Option<TemplateAsset>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(template_id) = lock_template_by_slug(&mut tx, slug).await? else {
            return Ok(None);
        };

        if kind == AssetKind::Thumbnail {
            Self::demote_thumbnails(&mut tx, template_id, None).await?;
        }

        let sort_order = match sort_order {
            Some(order) => order,
            None => {
                sqlx::query_scalar::<_, i32>(
                    "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM template_assets \
                     WHERE template_id = $1 AND kind = $2",
                )
                .bind(template_id)
                .bind(kind.as_str())
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let query = format!(
            "INSERT INTO template_assets (template_id, kind, url, sort_order) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let asset = sqlx::query_as::<_, TemplateAsset>(&query)
            .bind(template_id)
            .bind(kind.as_str())
            .bind(url)
            .bind(sort_order)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(asset))
    }

    /// Change an asset's kind and/or sort order. With neither supplied the
    /// asset is returned unchanged.
    pub async fn update(
        pool: &PgPool,
        slug: &str,
        asset_id: DbId,
        kind: Option<AssetKind>,
        sort_order: Option<i32>,
    ) -> Result<Option<TemplateAsset>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(template_id) = lock_template_by_slug(&mut tx, slug).await? else {
            return Ok(None);
        };

        let select = format!("SELECT {COLUMNS} FROM template_assets WHERE id = $1 AND template_id = $2");
        let Some(current) = sqlx::query_as::<_, TemplateAsset>(&select)
            .bind(asset_id)
            .bind(template_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if kind.is_none() && sort_order.is_none() {
            return Ok(Some(current));
        }

        if kind == Some(AssetKind::Thumbnail) {
            Self::demote_thumbnails(&mut tx, template_id, Some(asset_id)).await?;
        }

        let query = format!(
            "UPDATE template_assets SET \
                kind = COALESCE($3, kind), \
                sort_order = COALESCE($4, sort_order) \
             WHERE id = $1 AND template_id = $2 \
             RETURNING {COLUMNS}"
        );
        let asset = sqlx::query_as::<_, TemplateAsset>(&query)
            .bind(asset_id)
            .bind(template_id)
            .bind(kind.map(AssetKind::as_str))
            .bind(sort_order)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(asset))
    }

    /// Delete an asset scoped to its template. Returns the deleted row so the
    /// caller can release the stored bytes.
    pub async fn delete(
        pool: &PgPool,
        slug: &str,
        asset_id: DbId,
    ) -> Result<Option<TemplateAsset>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(template_id) = lock_template_by_slug(&mut tx, slug).await? else {
            return Ok(None);
        };

        let query = format!(
            "DELETE FROM template_assets WHERE id = $1 AND template_id = $2 RETURNING {COLUMNS}"
        );
        let deleted = sqlx::query_as::<_, TemplateAsset>(&query)
            .bind(asset_id)
            .bind(template_id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }

    /// Point the template's thumbnail at `url`: the lowest-sort-order
    /// thumbnail is updated in place, otherwise a new one is inserted at
    /// sort order 0. Blank URLs are ignored.
    ///
    /// Returns the URL that was replaced when no asset row references it
    /// any more, so the caller can remove the stored file after commit.
    pub async fn upsert_thumbnail(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: DbId,
        url: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(None);
        }

        let existing: Option<(DbId, String)> = sqlx::query_as(
            "SELECT id, url FROM template_assets \
             WHERE template_id = $1 AND kind = 'thumbnail' \
             ORDER BY sort_order ASC, id ASC LIMIT 1",
        )
        .bind(template_id)
        .fetch_optional(&mut **tx)
        .await?;

        let Some((asset_id, previous)) = existing else {
            sqlx::query(
                "INSERT INTO template_assets (template_id, kind, url, sort_order) \
                 VALUES ($1, 'thumbnail', $2, 0)",
            )
            .bind(template_id)
            .bind(url)
            .execute(&mut **tx)
            .await?;
            return Ok(None);
        };

        if previous == url {
            return Ok(None);
        }

        sqlx::query("UPDATE template_assets SET url = $2 WHERE id = $1")
            .bind(asset_id)
            .bind(url)
            .execute(&mut **tx)
            .await?;

        let still_referenced: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM template_assets WHERE url = $1)")
                .bind(&previous)
                .fetch_one(&mut **tx)
                .await?;

        Ok((!still_referenced).then_some(previous))
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Demote every thumbnail of the template except `keep` to `preview`.
    async fn demote_thumbnails(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: DbId,
        keep: Option<DbId>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE template_assets SET kind = 'preview' \
             WHERE template_id = $1 AND kind = 'thumbnail' \
               AND ($2::BIGINT IS NULL OR id <> $2)",
        )
        .bind(template_id)
        .bind(keep)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
