//! Repository for the `templates` table: admin CRUD, publish lifecycle and
//! the admin/public listings.

use imageai_core::listing::{ListingKind, Page, SortKey};
use imageai_core::tags::{parse_tags_csv, TagMode};
use imageai_core::template::{TemplateStatus, ValidTemplateFields, Visibility};
use imageai_core::types::DbId;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};

use super::{lock_template_by_slug, TagRepo, TemplateAssetRepo};
use crate::models::template::{
    AdminTemplate, PublicTemplate, PublishOutcome, TemplateListParams, TemplatePrompt,
    UpdatedTemplate,
};

/// Lowest-sort-order thumbnail, as a correlated subquery on `t`.
const THUMBNAIL_SUBQUERY: &str = "\
    (SELECT ta.url FROM template_assets ta \
     WHERE ta.template_id = t.id AND ta.kind = 'thumbnail' \
     ORDER BY ta.sort_order ASC, ta.id ASC LIMIT 1)";

/// Column list for [`AdminTemplate`] queries over `templates t`.
fn admin_columns() -> String {
    format!(
        "t.slug AS id, t.slug, t.name, t.description, \
         {THUMBNAIL_SUBQUERY} AS thumbnail_url, \
         t.status, t.visibility, t.published_at, t.usage_count, t.updated_at, \
         ARRAY(SELECT tg.slug FROM template_tags tt \
               JOIN tags tg ON tg.id = tt.tag_id \
               WHERE tt.template_id = t.id ORDER BY tg.slug) AS tags"
    )
}

/// Column list for [`PublicTemplate`] queries over `templates t`.
fn public_columns() -> String {
    format!(
        "t.slug AS id, t.name, {THUMBNAIL_SUBQUERY} AS thumbnail_url, \
         t.published_at, t.usage_count"
    )
}

/// Blank descriptions are stored as NULL.
fn clean_description(description: Option<&str>) -> Option<&str> {
    description.map(str::trim).filter(|d| !d.is_empty())
}

/// Provides CRUD and lifecycle operations for templates.
pub struct TemplateRepo;

impl TemplateRepo {
    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Find a template by slug with admin fields.
    pub async fn find_admin_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<AdminTemplate>, sqlx::Error> {
        let query = format!("SELECT {} FROM templates t WHERE t.slug = $1", admin_columns());
        sqlx::query_as::<_, AdminTemplate>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Resolve a slug to its primary key.
    pub async fn find_id_by_slug(pool: &PgPool, slug: &str) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM templates WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Resolve the current version's prompt for a slug. Templates without a
    /// current version resolve to `None`.
    pub async fn find_prompt_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<TemplatePrompt>, sqlx::Error> {
        sqlx::query_as::<_, TemplatePrompt>(
            "SELECT t.id AS template_id, t.slug, tv.prompt_template, tv.model_name \
             FROM templates t \
             JOIN template_versions tv ON tv.id = t.current_version_id \
             WHERE t.slug = $1",
        )
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    /// Admin listing: every status and visibility, optionally filtered.
    pub async fn list_admin(
        pool: &PgPool,
        params: &TemplateListParams,
    ) -> Result<Vec<AdminTemplate>, sqlx::Error> {
        let filter = ListFilter::from_params(params, ListingKind::Admin);
        let query = filter.build_query(&admin_columns(), &[]);
        filter
            .bind_all(sqlx::query_as::<_, AdminTemplate>(&query))
            .fetch_all(pool)
            .await
    }

    /// Public listing: only published, public templates.
    pub async fn list_public(
        pool: &PgPool,
        params: &TemplateListParams,
    ) -> Result<Vec<PublicTemplate>, sqlx::Error> {
        let filter = ListFilter::from_params(params, ListingKind::Public);
        let query = filter.build_query(
            &public_columns(),
            &["t.status = 'published'", "t.visibility = 'public'"],
        );
        filter
            .bind_all(sqlx::query_as::<_, PublicTemplate>(&query))
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a template, link its tags additively and set the thumbnail if
    /// a URL is given. A `published` template is stamped with `published_at`.
    pub async fn create(
        pool: &PgPool,
        slug: &str,
        fields: &ValidTemplateFields,
        description: Option<&str>,
        thumbnail_url: Option<&str>,
    ) -> Result<AdminTemplate, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let template_id: DbId = sqlx::query_scalar(
            "INSERT INTO templates (slug, name, description, status, visibility, published_at) \
             VALUES ($1, $2, $3, $4, $5, CASE WHEN $6 THEN NOW() END) \
             RETURNING id",
        )
        .bind(slug)
        .bind(&fields.name)
        .bind(clean_description(description))
        .bind(fields.status.as_str())
        .bind(fields.visibility.as_str())
        .bind(fields.status == TemplateStatus::Published)
        .fetch_one(&mut *tx)
        .await?;

        TagRepo::reconcile(&mut tx, template_id, &fields.tags, TagMode::Additive).await?;
        if let Some(url) = thumbnail_url {
            TemplateAssetRepo::upsert_thumbnail(&mut tx, template_id, url).await?;
        }

        let template = Self::fetch_admin_tx(&mut tx, template_id).await?;
        tx.commit().await?;
        Ok(template)
    }

    /// Full replace of the mutable fields. Tags are replaced; `published_at`
    /// keeps its first value while the status stays `published` and is
    /// cleared otherwise. A displaced thumbnail URL is reported back.
    pub async fn update(
        pool: &PgPool,
        slug: &str,
        fields: &ValidTemplateFields,
        description: Option<&str>,
        thumbnail_url: Option<&str>,
    ) -> Result<Option<UpdatedTemplate>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let template_id: Option<DbId> = sqlx::query_scalar(
            "UPDATE templates t SET \
                name = $2, \
                description = $3, \
                status = $4, \
                visibility = $5, \
                published_at = CASE WHEN $6 THEN COALESCE(t.published_at, NOW()) END, \
                updated_at = NOW() \
             WHERE t.slug = $1 \
             RETURNING t.id",
        )
        .bind(slug)
        .bind(&fields.name)
        .bind(clean_description(description))
        .bind(fields.status.as_str())
        .bind(fields.visibility.as_str())
        .bind(fields.status == TemplateStatus::Published)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(template_id) = template_id else {
            return Ok(None);
        };

        TagRepo::reconcile(&mut tx, template_id, &fields.tags, TagMode::Replace).await?;
        let replaced_thumbnail = match thumbnail_url {
            Some(url) => TemplateAssetRepo::upsert_thumbnail(&mut tx, template_id, url).await?,
            None => None,
        };

        let template = Self::fetch_admin_tx(&mut tx, template_id).await?;
        tx.commit().await?;
        Ok(Some(UpdatedTemplate {
            template,
            replaced_thumbnail,
        }))
    }

    /// Delete a template; assets, tag links and versions cascade.
    /// Returns the URLs of the deleted assets, or `None` if the slug is unknown.
    pub async fn delete(pool: &PgPool, slug: &str) -> Result<Option<Vec<String>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(template_id) = lock_template_by_slug(&mut tx, slug).await? else {
            return Ok(None);
        };

        let urls: Vec<String> =
            sqlx::query_scalar("SELECT url FROM template_assets WHERE template_id = $1")
                .bind(template_id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(template_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(urls))
    }

    /// The gated publish action.
    ///
    /// The template row is locked first, then the status write is
    /// conditional on a non-empty thumbnail existing, so the check and the
    /// write are atomic with respect to asset mutations (which take the same
    /// lock). `published_at` is always refreshed.
    pub async fn publish(pool: &PgPool, slug: &str) -> Result<PublishOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(template_id) = lock_template_by_slug(&mut tx, slug).await? else {
            return Ok(PublishOutcome::NotFound);
        };

        let published: Option<DbId> = sqlx::query_scalar(
            "UPDATE templates SET \
                status = 'published', \
                published_at = NOW(), \
                updated_at = NOW() \
             WHERE id = $1 \
               AND EXISTS ( \
                   SELECT 1 FROM template_assets ta \
                   WHERE ta.template_id = $1 \
                     AND ta.kind = 'thumbnail' \
                     AND btrim(ta.url) <> '') \
             RETURNING id",
        )
        .bind(template_id)
        .fetch_optional(&mut *tx)
        .await?;

        if published.is_none() {
            return Ok(PublishOutcome::ThumbnailRequired);
        }

        let template = Self::fetch_admin_tx(&mut tx, template_id).await?;
        tx.commit().await?;
        Ok(PublishOutcome::Published(template))
    }

    /// Unconditional: back to `draft` with `published_at` cleared.
    pub async fn unpublish(pool: &PgPool, slug: &str) -> Result<Option<AdminTemplate>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let template_id: Option<DbId> = sqlx::query_scalar(
            "UPDATE templates SET \
                status = 'draft', \
                published_at = NULL, \
                updated_at = NOW() \
             WHERE slug = $1 \
             RETURNING id",
        )
        .bind(slug)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(template_id) = template_id else {
            return Ok(None);
        };

        let template = Self::fetch_admin_tx(&mut tx, template_id).await?;
        tx.commit().await?;
        Ok(Some(template))
    }

    /// Record one use of a template by the image-processing path.
    pub async fn increment_usage(pool: &PgPool, template_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE templates SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(template_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Insert or refresh a template by slug for seeding. Returns its id.
    pub async fn upsert_seed(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        slug: &str,
        name: &str,
        status: TemplateStatus,
        visibility: Visibility,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO templates (slug, name, status, visibility, published_at) \
             VALUES ($1, $2, $3, $4, CASE WHEN $5 THEN NOW() END) \
             ON CONFLICT (slug) DO UPDATE SET \
                name = EXCLUDED.name, \
                status = EXCLUDED.status, \
                visibility = EXCLUDED.visibility, \
                published_at = CASE WHEN $5 THEN COALESCE(templates.published_at, NOW()) END, \
                updated_at = NOW() \
             RETURNING id",
        )
        .bind(slug)
        .bind(name)
        .bind(status.as_str())
        .bind(visibility.as_str())
        .bind(status == TemplateStatus::Published)
        .fetch_one(&mut **tx)
        .await
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Re-read a template inside the write transaction that changed it.
    async fn fetch_admin_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: DbId,
    ) -> Result<AdminTemplate, sqlx::Error> {
        let query = format!("SELECT {} FROM templates t WHERE t.id = $1", admin_columns());
        sqlx::query_as::<_, AdminTemplate>(&query)
            .bind(template_id)
            .fetch_one(&mut **tx)
            .await
    }
}

// ---------------------------------------------------------------------------
// Listing filter
// ---------------------------------------------------------------------------

/// Normalized listing filter. Conditions are numbered in the order
/// [`ListFilter::bind_all`] binds them.
struct ListFilter {
    kind: ListingKind,
    search: Option<String>,
    status: Option<String>,
    visibility: Option<String>,
    tags: Vec<String>,
    sort: SortKey,
    page: Page,
}

impl ListFilter {
    fn from_params(params: &TemplateListParams, kind: ListingKind) -> Self {
        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let admin_only = |v: &Option<String>| match kind {
            ListingKind::Admin => non_blank(v),
            ListingKind::Public => None,
        };

        Self {
            kind,
            search: non_blank(&params.q),
            status: admin_only(&params.status),
            visibility: admin_only(&params.visibility),
            tags: parse_tags_csv(params.tags.as_deref()),
            sort: SortKey::resolve(params.sort.as_deref(), kind),
            page: Page::new(params.limit, params.offset),
        }
    }

    fn build_query(&self, columns: &str, fixed_conditions: &[&str]) -> String {
        let mut conditions: Vec<String> = fixed_conditions.iter().map(|c| c.to_string()).collect();
        let mut bind_idx = 1u32;

        if self.search.is_some() {
            conditions.push(format!(
                "(t.name ILIKE ${bind_idx} OR t.slug ILIKE ${bind_idx})"
            ));
            bind_idx += 1;
        }
        if self.status.is_some() {
            conditions.push(format!("t.status = ${bind_idx}"));
            bind_idx += 1;
        }
        if self.visibility.is_some() {
            conditions.push(format!("t.visibility = ${bind_idx}"));
            bind_idx += 1;
        }
        if !self.tags.is_empty() {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM template_tags tt \
                         JOIN tags tg ON tg.id = tt.tag_id \
                         WHERE tt.template_id = t.id AND tg.slug = ANY(${bind_idx}))"
            ));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        format!(
            "SELECT {columns} FROM templates t {where_clause} \
             ORDER BY {order_by} \
             LIMIT ${bind_idx} OFFSET ${next_idx}",
            order_by = self.sort.order_by(self.kind),
            next_idx = bind_idx + 1,
        )
    }

    fn bind_all<'q, O>(
        &'q self,
        mut q: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        if let Some(ref search) = self.search {
            q = q.bind(format!("%{}%", escape_like(search)));
        }
        if let Some(ref status) = self.status {
            q = q.bind(status.as_str());
        }
        if let Some(ref visibility) = self.visibility {
            q = q.bind(visibility.as_str());
        }
        if !self.tags.is_empty() {
            q = q.bind(&self.tags);
        }
        q.bind(self.page.limit).bind(self.page.offset)
    }
}

/// Make `%` and `_` match literally. Backslash is the default LIKE escape.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
