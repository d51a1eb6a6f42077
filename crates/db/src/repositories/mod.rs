//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&PgPool` (or an open transaction, for helpers composed into a larger
//! write) as the first argument.

pub mod tag_repo;
pub mod template_asset_repo;
pub mod template_repo;
pub mod template_version_repo;
pub mod user_profile_repo;

pub use tag_repo::TagRepo;
pub use template_asset_repo::TemplateAssetRepo;
pub use template_repo::TemplateRepo;
pub use template_version_repo::TemplateVersionRepo;
pub use user_profile_repo::UserProfileRepo;

/// Lock a template row for the rest of the transaction and return its id.
///
/// Publishing and every asset mutation take this lock first, so the publish
/// thumbnail check cannot interleave with an asset demote or delete.
pub(crate) async fn lock_template_by_slug(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    slug: &str,
) -> Result<Option<imageai_core::types::DbId>, sqlx::Error> {
    sqlx::query_scalar::<_, imageai_core::types::DbId>(
        "SELECT id FROM templates WHERE slug = $1 FOR UPDATE",
    )
    .bind(slug)
    .fetch_optional(&mut **tx)
    .await
}
